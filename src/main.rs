use waypoint::{App, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load();
    let mut app = App::with_config(cfg);

    app.get("/", |_req, res| {
        res.send("Eureka!");
        Ok(())
    });

    app.get("/home/:epic", |req, res| {
        let epic = req.params.get("epic").unwrap_or_default().to_string();
        tracing::info!(epic = %epic, "home hit");
        res.send(format!("{epic}!"));
        Ok(())
    });

    tokio::select! {
        res = app.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
