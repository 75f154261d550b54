use bytes::Bytes;
use phial_core::{
    AppConfig, ChannelReceive, ChannelSink, Error, PathParams, Phial, ReceiveMessage, Request,
    Response, Router, Scope, SendMessage,
};
use tokio::sync::mpsc;

fn echo_app() -> Phial {
    let router = Router::new()
        .route("^/echo$", |req: Request, _params: PathParams| async move {
            Ok::<_, Error>(req.body().clone())
        })
        .unwrap();
    Phial::new(router)
}

async fn collect(mut rx: mpsc::Receiver<SendMessage>) -> Vec<SendMessage> {
    let mut sent = Vec::new();
    while let Some(message) = rx.recv().await {
        sent.push(message);
    }
    sent
}

#[tokio::test]
async fn test_channel_host_streams_body() {
    let (body_tx, body_rx) = mpsc::channel(4);
    let (send_tx, send_rx) = mpsc::channel(4);

    let app = echo_app();
    let server = tokio::spawn(async move {
        let mut receive = ChannelReceive(body_rx);
        let mut send = ChannelSink(send_tx);
        app.handle(Scope::http("POST", "/echo"), &mut receive, &mut send)
            .await
    });

    for (chunk, more) in [("he", true), ("", true), ("llo", false)] {
        body_tx
            .send(ReceiveMessage::chunk(chunk, more))
            .await
            .unwrap();
    }

    server.await.unwrap().unwrap();
    let sent = collect(send_rx).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].status(), Some(200));
    assert_eq!(sent[1].body(), Some(&Bytes::from_static(b"hello")));
}

#[tokio::test]
async fn test_closed_receive_channel_ends_body() {
    let (body_tx, body_rx) = mpsc::channel(4);
    let (send_tx, send_rx) = mpsc::channel(4);

    body_tx
        .send(ReceiveMessage::chunk("partial", true))
        .await
        .unwrap();
    drop(body_tx);

    let mut receive = ChannelReceive(body_rx);
    let mut send = ChannelSink(send_tx);
    echo_app()
        .handle(Scope::http("POST", "/echo"), &mut receive, &mut send)
        .await
        .unwrap();
    drop(send);

    let sent = collect(send_rx).await;
    assert_eq!(sent[1].body(), Some(&Bytes::from_static(b"partial")));
}

#[tokio::test]
async fn test_closure_channels() {
    let mut sent = Vec::new();
    {
        let mut receive = || async { Ok::<_, Error>(ReceiveMessage::empty()) };
        let mut send = |message: SendMessage| {
            sent.push(message);
            async { Ok::<(), Error>(()) }
        };
        echo_app()
            .handle(Scope::http("GET", "/nowhere"), &mut receive, &mut send)
            .await
            .unwrap();
    }
    assert_eq!(sent[0].status(), Some(404));
}

#[tokio::test]
async fn test_unreadable_headers_reach_server_error_view() {
    let router = Router::new()
        .route("^/", |_req, _params| async { Ok::<_, Error>("unreachable") })
        .unwrap()
        .with_server_error(|req: Request, err: Error| async move {
            let kind = if err.is_malformed_request() { "bad request" } else { "failure" };
            Response::text(format!("{} on {}", kind, req.path())).with_status(err.status_code())
        });
    let app = Phial::new(router);

    let mut scope = Scope::http("GET", "/x");
    scope
        .headers
        .push((Bytes::from_static(b"x-bad"), Bytes::from_static(&[0xc3, 0x28])));

    let mut receive = || async { Ok::<_, Error>(ReceiveMessage::empty()) };
    let (send_tx, send_rx) = mpsc::channel(4);
    let mut send = ChannelSink(send_tx);
    app.handle(scope, &mut receive, &mut send).await.unwrap();
    drop(send);

    let sent = collect(send_rx).await;
    assert_eq!(sent[0].status(), Some(400));
    assert_eq!(sent[1].body(), Some(&Bytes::from_static(b"bad request on /x")));
}

#[tokio::test]
async fn test_uncaught_panics_unwind_when_disabled() {
    let router = Router::new()
        .route("^/", |_req, _params| async {
            if true {
                panic!("boom");
            }
            Ok::<_, Error>("unreachable")
        })
        .unwrap();
    let app = Phial::new(router).with_config(AppConfig::default().with_catch_panics(false));

    let task = tokio::spawn(async move {
        let mut receive = || async { Ok::<_, Error>(ReceiveMessage::empty()) };
        let mut send = |_message: SendMessage| async { Ok::<(), Error>(()) };
        app.handle(Scope::http("GET", "/"), &mut receive, &mut send).await
    });
    assert!(task.await.unwrap_err().is_panic());
}
