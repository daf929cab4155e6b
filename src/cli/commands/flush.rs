//! Flush-cache command

use crate::config::Config;
use crate::error::{FmtdError, FmtdResult};
use crate::service::protocol::{Request, Response};
use crate::service::FormatService;

/// Execute the flush-cache command
pub async fn execute(config: &Config) -> FmtdResult<()> {
    let service = FormatService::from_config(config);

    match service.dispatch(Request::FlushCache).await {
        Response::Ok { message } => {
            println!("{}", message);
            Ok(())
        }
        other => Err(FmtdError::Internal(format!(
            "unexpected response to flush: {:?}",
            other
        ))),
    }
}
