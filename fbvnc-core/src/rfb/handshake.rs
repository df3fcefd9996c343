//! Connection setup: version exchange, security, ClientInit/ServerInit.
//!
//! ```text
//! server                         client
//!   ── "RFB 003.008\n" ─────────▶
//!   ◀──────────── "RFB 003.00x\n" ──
//!   ── security (None) ─────────▶    3.3: u32 type
//!   ◀──────────── chosen type ─────   3.7+: [count, types…] / u8
//!   ── SecurityResult OK ───────▶    3.8 only
//!   ◀──────────── ClientInit ──────   shared flag, ignored
//!   ── ServerInit ──────────────▶
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FbvncError;
use crate::rfb::protocol::{PROTOCOL_VERSION, ProtocolVersion, SECURITY_NONE, ServerInit};

/// Run the server side of the RFB handshake on a fresh stream.
///
/// Every client is treated as shared regardless of its ClientInit flag.
pub async fn handshake<S>(stream: &mut S, init: &ServerInit) -> Result<ProtocolVersion, FbvncError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(PROTOCOL_VERSION).await?;
    stream.flush().await?;

    let mut raw = [0u8; 12];
    stream.read_exact(&mut raw).await?;
    let version = ProtocolVersion::parse(&raw)?;

    if version == ProtocolVersion::V3_3 {
        stream.write_all(&u32::from(SECURITY_NONE).to_be_bytes()).await?;
    } else {
        stream.write_all(&[1, SECURITY_NONE]).await?;
        stream.flush().await?;

        let mut chosen = [0u8; 1];
        stream.read_exact(&mut chosen).await?;
        if chosen[0] != SECURITY_NONE {
            if version == ProtocolVersion::V3_8 {
                let reason = b"unsupported security type";
                stream.write_all(&1u32.to_be_bytes()).await?;
                stream.write_all(&(reason.len() as u32).to_be_bytes()).await?;
                stream.write_all(reason).await?;
                stream.flush().await?;
            }
            return Err(FbvncError::Protocol("client chose an unoffered security type"));
        }
        if version == ProtocolVersion::V3_8 {
            stream.write_all(&0u32.to_be_bytes()).await?;
        }
    }
    stream.flush().await?;

    let mut shared = [0u8; 1];
    stream.read_exact(&mut shared).await?;

    stream.write_all(&init.to_bytes()).await?;
    stream.flush().await?;
    Ok(version)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn init() -> ServerInit {
        ServerInit::new(4, 2, "Android")
    }

    #[tokio::test]
    async fn v3_8_handshake() {
        let init = init();
        let mut mock = Builder::new()
            .write(b"RFB 003.008\n")
            .read(b"RFB 003.008\n")
            .write(&[1, 1])
            .read(&[1])
            .write(&[0, 0, 0, 0])
            .read(&[1])
            .write(&init.to_bytes())
            .build();

        let version = handshake(&mut mock, &init).await.unwrap();
        assert_eq!(version, ProtocolVersion::V3_8);
    }

    #[tokio::test]
    async fn v3_7_skips_security_result() {
        let init = init();
        let mut mock = Builder::new()
            .write(b"RFB 003.008\n")
            .read(b"RFB 003.007\n")
            .write(&[1, 1])
            .read(&[1])
            .read(&[0])
            .write(&init.to_bytes())
            .build();

        let version = handshake(&mut mock, &init).await.unwrap();
        assert_eq!(version, ProtocolVersion::V3_7);
    }

    #[tokio::test]
    async fn v3_3_server_picks_security() {
        let init = init();
        let mut mock = Builder::new()
            .write(b"RFB 003.008\n")
            .read(b"RFB 003.003\n")
            .write(&[0, 0, 0, 1])
            .read(&[1])
            .write(&init.to_bytes())
            .build();

        let version = handshake(&mut mock, &init).await.unwrap();
        assert_eq!(version, ProtocolVersion::V3_3);
    }

    #[tokio::test]
    async fn rejected_security_type_fails() {
        let init = init();
        let mut mock = Builder::new()
            .write(b"RFB 003.008\n")
            .read(b"RFB 003.008\n")
            .write(&[1, 1])
            .read(&[2])
            .write(&[0, 0, 0, 1])
            .write(&[0, 0, 0, 25])
            .write(b"unsupported security type")
            .build();

        let err = handshake(&mut mock, &init).await.unwrap_err();
        assert!(matches!(err, FbvncError::Protocol(_)));
    }

    #[tokio::test]
    async fn bad_version_fails() {
        let init = init();
        let mut mock = Builder::new()
            .write(b"RFB 003.008\n")
            .read(b"SSH-2.0-xxxx")
            .build();

        let err = handshake(&mut mock, &init).await.unwrap_err();
        assert!(matches!(err, FbvncError::UnsupportedVersion(_)));
    }
}
