use anyhow::Result;

pub mod chat;
pub mod describe;
pub mod init;
pub mod simulate;

pub use chat::ChatCommand;
pub use describe::DescribeCommand;
pub use init::InitCommand;
pub use simulate::SimulateCommand;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
