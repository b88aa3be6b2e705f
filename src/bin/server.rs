use tracing::Level;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    let level = Some(Level::DEBUG);
    #[cfg(not(debug_assertions))]
    let level = Some(Level::INFO);

    let r = slidelink_backend::create(level).await?;
    if let Err(e) = r.launch().await {
        let message = e.to_string();
        tracing::error!("Error launching server: {}", message);
        anyhow::bail!(message);
    }

    Ok(())
}
