//! Integration tests: a real RFB client talking to a session over
//! localhost TCP, with an in-memory frame and a recording key sink.

use std::time::{Duration, Instant};

use fbvnc_core::{
    Geometry, InputDispatcher, LoopState, MemoryFrame, ProtocolAdapter, RfbServer, ServerInit,
    Session, SessionConfig,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

type TestSession = Session<MemoryFrame, RfbServer, InputDispatcher<Vec<Vec<u8>>>>;

const WIDTH: u16 = 4;
const HEIGHT: u16 = 2;

// ── Helpers ──────────────────────────────────────────────────────

async fn start_session(pixels: Vec<u16>) -> (TestSession, std::net::SocketAddr) {
    let geometry = Geometry::rgb565(WIDTH.into(), HEIGHT.into());
    let frame = MemoryFrame::from_pixels(geometry, pixels).unwrap();
    let server = RfbServer::bind("127.0.0.1:0", ServerInit::new(WIDTH, HEIGHT, "test"))
        .await
        .unwrap();
    let addr = server.local_addr();
    let dispatcher = InputDispatcher::new(Some(Vec::new()));
    let session = Session::new(frame, server, dispatcher, SessionConfig::default()).unwrap();
    (session, addr)
}

/// Drive the session until `client` completes.
async fn drive<T>(session: &mut TestSession, client: JoinHandle<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !client.is_finished() {
        assert!(Instant::now() < deadline, "client did not finish in time");
        session.run_cycle().await.unwrap();
    }
    client.await.unwrap()
}

/// Client side of the 3.8 handshake. Returns (width, height, name).
async fn client_handshake(stream: &mut TcpStream) -> (u16, u16, String) {
    let mut version = [0u8; 12];
    stream.read_exact(&mut version).await.unwrap();
    assert_eq!(&version, b"RFB 003.008\n");
    stream.write_all(b"RFB 003.008\n").await.unwrap();

    let mut security = [0u8; 2];
    stream.read_exact(&mut security).await.unwrap();
    assert_eq!(security, [1, 1]);
    stream.write_all(&[1]).await.unwrap();

    let mut result = [0u8; 4];
    stream.read_exact(&mut result).await.unwrap();
    assert_eq!(result, [0, 0, 0, 0]);

    stream.write_all(&[1]).await.unwrap(); // ClientInit, shared

    let mut init = [0u8; 24];
    stream.read_exact(&mut init).await.unwrap();
    let width = u16::from_be_bytes([init[0], init[1]]);
    let height = u16::from_be_bytes([init[2], init[3]]);
    assert_eq!(&init[4..8], &[16, 15, 0, 1]);
    let name_len = u32::from_be_bytes([init[20], init[21], init[22], init[23]]) as usize;
    let mut name = vec![0u8; name_len];
    stream.read_exact(&mut name).await.unwrap();
    (width, height, String::from_utf8(name).unwrap())
}

async fn request_update(stream: &mut TcpStream, incremental: bool) {
    let mut msg = vec![3, incremental as u8];
    for v in [0, 0, WIDTH, HEIGHT] {
        msg.extend_from_slice(&v.to_be_bytes());
    }
    stream.write_all(&msg).await.unwrap();
}

async fn key_event(stream: &mut TcpStream, keysym: u32, down: bool) {
    let mut msg = vec![4, down as u8, 0, 0];
    msg.extend_from_slice(&keysym.to_be_bytes());
    stream.write_all(&msg).await.unwrap();
}

/// Read one FramebufferUpdate of native-format Raw rects into `fb`.
async fn apply_update(stream: &mut TcpStream, fb: &mut [u16]) {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0], 0);
    let rects = u16::from_be_bytes([header[2], header[3]]);

    for _ in 0..rects {
        let mut rect = [0u8; 12];
        stream.read_exact(&mut rect).await.unwrap();
        let field = |i: usize| u16::from_be_bytes([rect[i], rect[i + 1]]) as usize;
        let (x, y, w, h) = (field(0), field(2), field(4), field(6));
        assert_eq!(&rect[8..12], &[0, 0, 0, 0], "expected Raw encoding");

        let mut pixels = vec![0u8; w * h * 2];
        stream.read_exact(&mut pixels).await.unwrap();
        for row in 0..h {
            for col in 0..w {
                let i = (row * w + col) * 2;
                fb[(y + row) * WIDTH as usize + x + col] =
                    u16::from_le_bytes([pixels[i], pixels[i + 1]]);
            }
        }
    }
}

// ── End to end ───────────────────────────────────────────────────

#[tokio::test]
async fn test_client_receives_converted_frame_and_sends_keys() {
    // 5-6-5 red, green, blue, white, then black.
    let live = vec![0xF800, 0x07E0, 0x001F, 0xFFFF, 0, 0, 0, 0];
    let expected = vec![0x001F, 0x03E0, 0x7C00, 0x7FFF, 0, 0, 0, 0];
    let (mut session, addr) = start_session(live).await;

    let client = tokio::spawn({
        let expected = expected.clone();
        async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let (w, h, name) = client_handshake(&mut stream).await;
            assert_eq!((w, h, name.as_str()), (WIDTH, HEIGHT, "test"));

            key_event(&mut stream, 'a' as u32, true).await;
            key_event(&mut stream, 'a' as u32, false).await;

            let mut fb = vec![0u16; WIDTH as usize * HEIGHT as usize];
            request_update(&mut stream, false).await;
            apply_update(&mut stream, &mut fb).await;
            for _ in 0..10 {
                if fb == expected {
                    break;
                }
                request_update(&mut stream, true).await;
                apply_update(&mut stream, &mut fb).await;
            }
            fb
        }
    });

    let fb = drive(&mut session, client).await;
    assert_eq!(fb, expected);
    assert_eq!(
        session.handler().sink().unwrap(),
        &vec![vec![0x1E], vec![0x9E]]
    );
    assert!(session.passes() >= 1);
}

#[tokio::test]
async fn test_frame_change_reaches_client_incrementally() {
    let (mut session, addr) = start_session(vec![0; 8]).await;

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();
    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        client_handshake(&mut stream).await;

        let mut fb = vec![0xAAAAu16; 8];
        request_update(&mut stream, false).await;
        apply_update(&mut stream, &mut fb).await;
        assert_eq!(fb, vec![0; 8]);
        ready_tx.send(()).unwrap();

        go_rx.await.unwrap();
        request_update(&mut stream, true).await;
        apply_update(&mut stream, &mut fb).await;
        fb
    });

    let mut ready_rx = ready_rx;
    let deadline = Instant::now() + Duration::from_secs(5);
    while ready_rx.try_recv().is_err() {
        assert!(Instant::now() < deadline, "initial update never arrived");
        session.run_cycle().await.unwrap();
    }

    // Bottom-right pixel turns blue.
    session.source_mut().set(3, 1, 0x001F);
    go_tx.send(()).unwrap();

    let fb = drive(&mut session, client).await;
    assert_eq!(fb[7], 0x7C00);
    assert_eq!(&fb[..6], &[0; 6]);
}

#[tokio::test]
async fn test_bad_version_is_rejected_without_joining() {
    let (mut session, addr) = start_session(vec![0; 8]).await;

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut version = [0u8; 12];
        stream.read_exact(&mut version).await.unwrap();
        stream.write_all(b"RFB 004.001\n").await.unwrap();

        // Server closes the connection.
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap_or_default()
    });

    let read = drive(&mut session, client).await;
    assert_eq!(read, 0);
    assert_eq!(session.state(), LoopState::Idle);
    assert_eq!(session.adapter().client_count(), 0);
}

#[tokio::test]
async fn test_unknown_message_drops_client() {
    let (mut session, addr) = start_session(vec![0; 8]).await;

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        client_handshake(&mut stream).await;
        stream.write_all(&[0xFA, 0, 0, 0]).await.unwrap();

        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap_or_default()
    });

    drive(&mut session, client).await;
    for _ in 0..3 {
        session.run_cycle().await.unwrap();
    }
    assert_eq!(session.adapter().client_count(), 0);
    assert_eq!(session.state(), LoopState::Idle);
}
