mod device_api;
mod frames;
mod host;
mod link;
mod operator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
