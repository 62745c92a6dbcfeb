use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use spacecat::context::AppContext;
use spacecat::core::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Error> {
    spacecat::setup_logging();

    let config = AppConfig::from_env()?;
    let app = Arc::new(AppContext::from_config(config).await?);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let app = Arc::clone(&app);
        async move { spacecat::api::handler(&app, event).await }
    }))
    .await
}
