// Headless entry point; the webview shell talks to the local API.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quotewatch_desktop_lib::run().await?;
    Ok(())
}
