// ABOUTME: Command handlers dispatched from the CLI.
// ABOUTME: Each handler loads config, opens a session, and drives the engine.

mod app;
mod deploy;
mod down;
mod init;
mod proxy;
mod rollback;
mod up;

pub use app::app;
pub use deploy::{deploy, prune, redeploy};
pub use down::down;
pub use init::init;
pub use proxy::proxy;
pub use rollback::rollback;
pub use up::up;

use crate::config::Config;
use crate::error::Result;
use crate::ssh::Session;

pub(crate) async fn connect(config: &Config) -> Result<Session> {
    let session = Session::connect(config.host.session_config()).await?;
    Ok(session)
}
