use std::net::SocketAddr;

use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut consume_per_sec: u64 = 0;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--consume" => {
                let rate = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--consume requires messages per second"))?;
                consume_per_sec = rate.parse()?;
            }
            "-h" | "--help" => {
                eprintln!(
                    "mqload-testserver\n\nUSAGE:\n  mqload-testserver [--bind 127.0.0.1:0] [--consume N]\n\nOUTPUT:\n  Prints METRICS_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let state = mqload_testserver::MetricsState::default();
    if consume_per_sec > 0 {
        mqload_testserver::spawn_consumer(state.clone(), consume_per_sec);
    }
    let app = mqload_testserver::router(state);

    println!("METRICS_URL=http://{addr}{}", mqload_testserver::PATH_METRICS);

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    serve.await?;
    Ok(())
}
