use std::{io, time::Duration};

use tokio::{
    net::{lookup_host, TcpStream},
    time::{sleep, timeout},
};

pub const PROVIDER_HOST: &str = "www.youtube.com";
pub const PROVIDER_PORT: u16 = 80;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Resolves `host` and opens (then drops) a TCP connection to it.
pub async fn probe(host: &str, port: u16, connect_timeout: Duration) -> io::Result<()> {
    let addr = lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host has no addresses"))?;

    timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

    Ok(())
}

/// Blocks until `host:port` accepts a TCP connection, retrying every
/// `interval`. There is no upper bound on the wait.
pub async fn wait_until_reachable(host: &str, port: u16, interval: Duration) {
    loop {
        match probe(host, port, CONNECT_TIMEOUT).await {
            Ok(()) => {
                info!("Connected to {} successfully.", host);
                return;
            }
            Err(e) => {
                warn!(
                    "Unable to connect to {} ({}). Retrying in {} seconds.",
                    host,
                    e,
                    interval.as_secs()
                );
                sleep(interval).await;
            }
        }
    }
}

pub async fn wait_for_provider() {
    wait_until_reachable(PROVIDER_HOST, PROVIDER_PORT, RETRY_INTERVAL).await
}
