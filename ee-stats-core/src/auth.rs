use tracing::{error, info};

use crate::contract::Authenticator;
use crate::errors::PipelineError;

/// Log in through the given authenticator. No retry: a failed login stops the run.
pub async fn authenticate<A>(authenticator: &A) -> Result<(), PipelineError>
where
    A: Authenticator + ?Sized,
{
    match authenticator.login().await {
        Ok(()) => {
            info!("[AUTH] Logged in");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "[AUTH][ERROR] Login failed");
            Err(PipelineError::Authentication(e))
        }
    }
}
