use super::*;
use std::time::Duration;

use parking_lot::Mutex;

use crate::integration::push_client::PushClient;
use crate::mode::RunLoopRunResult;

struct RecordingHandler {
    payloads: Mutex<Vec<Bytes>>,
    run_loop: Arc<RunLoop>,
    stop_after: usize,
}

impl PushHandler for RecordingHandler {
    fn on_push(&self, payload: Bytes) {
        let mut payloads = self.payloads.lock();
        payloads.push(payload);
        if payloads.len() >= self.stop_after {
            self.run_loop.stop();
        }
    }
}

fn local_endpoint() -> PushEndpoint {
    PushEndpoint::new("127.0.0.1", 0)
}

#[test]
fn test_push_transport_endpoint() {
    assert!(PushTransport::Null.endpoint().is_none());
    assert_eq!(PushTransport::default(), PushTransport::Null);

    let transport = PushTransport::Tcp(PushEndpoint::new("127.0.0.1", 5555));
    assert_eq!(transport.endpoint().map(|e| e.to_string()), Some("127.0.0.1:5555".to_string()));
}

#[tokio::test]
async fn test_payload_forwarded_byte_for_byte_once() {
    let run_loop = Arc::new(RunLoop::default());
    let handler = Arc::new(RecordingHandler {
        payloads: Mutex::new(Vec::new()),
        run_loop: run_loop.clone(),
        stop_after: 1,
    });

    let bridge = PushBridge::bind(&local_endpoint(), handler.clone(), &run_loop)
        .await
        .unwrap();
    let endpoint = PushEndpoint::new("127.0.0.1", bridge.local_addr().port());

    let payload: &[u8] = b"{\"topic\":\"news\",\"data\":[1,2,\xff]}";
    let mut client = PushClient::connect(&endpoint).await.unwrap();
    client.push(Bytes::copy_from_slice(payload)).await.unwrap();

    let result = run_loop.run_for(Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, RunLoopRunResult::Stopped);

    let payloads = handler.payloads.lock();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].as_ref(), payload);
}

#[tokio::test]
async fn test_frames_from_one_publisher_keep_order() {
    let run_loop = Arc::new(RunLoop::default());
    let handler = Arc::new(RecordingHandler {
        payloads: Mutex::new(Vec::new()),
        run_loop: run_loop.clone(),
        stop_after: 3,
    });

    let bridge = PushBridge::bind(&local_endpoint(), handler.clone(), &run_loop)
        .await
        .unwrap();
    let endpoint = PushEndpoint::new("127.0.0.1", bridge.local_addr().port());

    let mut client = PushClient::connect(&endpoint).await.unwrap();
    for payload in ["one", "two", "three"] {
        client.push(payload).await.unwrap();
    }

    run_loop.run_for(Duration::from_secs(5)).await.unwrap();
    let payloads: Vec<_> = handler.payloads.lock().iter().cloned().collect();
    assert_eq!(payloads, vec![Bytes::from("one"), Bytes::from("two"), Bytes::from("three")]);
}

#[tokio::test]
async fn test_close_flushes_pending_frame() {
    let run_loop = Arc::new(RunLoop::default());
    let handler = Arc::new(RecordingHandler {
        payloads: Mutex::new(Vec::new()),
        run_loop: run_loop.clone(),
        stop_after: 1,
    });

    let bridge = PushBridge::bind(&local_endpoint(), handler.clone(), &run_loop)
        .await
        .unwrap();
    let endpoint = PushEndpoint::new("127.0.0.1", bridge.local_addr().port());

    let mut client = PushClient::connect(&endpoint).await.unwrap();
    assert_eq!(client.endpoint(), &endpoint);
    client.push("last words").await.unwrap();
    client.close().await.unwrap();

    let result = run_loop.run_for(Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, RunLoopRunResult::Stopped);
    assert_eq!(handler.payloads.lock().as_slice(), &[Bytes::from("last words")]);
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let run_loop = RunLoop::default();
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = PushEndpoint::new("127.0.0.1", occupied.local_addr().unwrap().port());

    struct Ignore;
    impl PushHandler for Ignore {
        fn on_push(&self, _payload: Bytes) {}
    }

    let result = PushBridge::bind(&endpoint, Arc::new(Ignore), &run_loop).await;
    assert!(matches!(result, Err(RunLoopError::PushBind { .. })));
}

#[tokio::test]
async fn test_shutdown_invalidates_source() {
    let run_loop = RunLoop::default();

    struct Ignore;
    impl PushHandler for Ignore {
        fn on_push(&self, _payload: Bytes) {}
    }

    let bridge = PushBridge::bind(&local_endpoint(), Arc::new(Ignore), &run_loop)
        .await
        .unwrap();
    assert!(bridge.is_valid());
    bridge.shutdown();
    assert!(!bridge.is_valid());
}
