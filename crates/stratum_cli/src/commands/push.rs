//! Push command - Build and push the application's images.

use anyhow::Result;

use super::build::{run, ImageArgs, Step};
use super::{GlobalArgs, Outcome};

pub async fn execute(global: &GlobalArgs, args: ImageArgs) -> Result<Outcome> {
    run(global, args, Step::Push).await
}
