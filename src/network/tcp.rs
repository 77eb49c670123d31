use tokio::net::TcpListener;

use crate::utils::Result;

/// Bind a TCP listener on `addr`; the caller drives `accept()`.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = tokio_test::block_on(bind("127.0.0.1:0")).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_bind_invalid_addr() {
        assert!(tokio_test::block_on(bind("not an address")).is_err());
    }
}
