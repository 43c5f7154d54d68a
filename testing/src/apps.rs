//! Ready-made managed applications for tests.
//!
//! Every responder here ignores the lifespan protocol: given a lifespan scope
//! it returns at once without sending anything, which is exactly how an
//! application without lifespan support behaves. Wrap a responder with
//! [`LifespanProbe::wrap`] to add a working handshake.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vellox_core::{Application, Message, RawHeaders, Receive, application_fn};

/// Read the whole inbound body of an HTTP conversation.
///
/// # Errors
///
/// Fails if the channel closes or a non-body message arrives first.
pub async fn read_body(receive: &mut Receive) -> anyhow::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        match receive.recv().await? {
            Message::HttpRequest {
                body: chunk,
                more_body,
            } => {
                body.extend_from_slice(&chunk);
                if !more_body {
                    return Ok(body);
                }
            },
            other => anyhow::bail!("expected 'http.request', received '{}'", other.kind()),
        }
    }
}

/// `content-type` header pair.
#[must_use]
pub fn content_type(value: &str) -> (Vec<u8>, Vec<u8>) {
    (b"content-type".to_vec(), value.as_bytes().to_vec())
}

/// Respond to every request with a fixed status, headers and body.
#[must_use]
pub fn responder(status: u16, headers: RawHeaders, body: Vec<u8>) -> impl Application {
    application_fn(move |scope, _receive, send| {
        let headers = headers.clone();
        let body = body.clone();
        async move {
            if scope.as_http().is_none() {
                return Ok(());
            }
            send.send(Message::response_start(status, headers))?;
            send.send(Message::response_body(body))?;
            Ok(())
        }
    })
}

/// Respond `200 application/json` with `value`.
#[must_use]
pub fn json_app(value: &serde_json::Value) -> impl Application {
    responder(
        200,
        vec![content_type("application/json")],
        value.to_string().into_bytes(),
    )
}

/// Respond `200 text/plain; charset=utf-8` with `text`.
#[must_use]
pub fn text_app(text: &str) -> impl Application {
    responder(
        200,
        vec![content_type("text/plain; charset=utf-8")],
        text.as_bytes().to_vec(),
    )
}

/// Echo the request back.
///
/// The body is returned unchanged with the request's `content-type`
/// (`application/octet-stream` if absent). Method, path and query string come
/// back as `x-echo-method`, `x-echo-path` and `x-echo-query`.
#[must_use]
pub fn echo_app() -> impl Application {
    application_fn(|scope, mut receive, send| async move {
        let Some(http) = scope.as_http() else {
            return Ok(());
        };
        let body = read_body(&mut receive).await?;
        let content_type = http
            .header("content-type")
            .map_or_else(|| b"application/octet-stream".to_vec(), <[u8]>::to_vec);

        send.send(Message::response_start(
            200,
            vec![
                (b"content-type".to_vec(), content_type),
                (b"x-echo-method".to_vec(), http.method().as_bytes().to_vec()),
                (b"x-echo-path".to_vec(), http.path().as_bytes().to_vec()),
                (b"x-echo-query".to_vec(), http.query_string().to_vec()),
            ],
        ))?;
        send.send(Message::response_body(body))?;
        Ok(())
    })
}

/// Stream `chunks` as separate body messages, the last one final.
#[must_use]
pub fn chunked_app(content_type_value: &str, chunks: Vec<Vec<u8>>) -> impl Application {
    let header = content_type(content_type_value);
    application_fn(move |scope, _receive, send| {
        let header = header.clone();
        let chunks = chunks.clone();
        async move {
            if scope.as_http().is_none() {
                return Ok(());
            }
            send.send(Message::response_start(200, vec![header]))?;
            let last = chunks.len().saturating_sub(1);
            for (index, chunk) in chunks.into_iter().enumerate() {
                if index == last {
                    send.send(Message::response_body(chunk))?;
                } else {
                    send.send(Message::response_chunk(chunk))?;
                }
            }
            Ok(())
        }
    })
}

/// Start a response, then raise `message`.
#[must_use]
pub fn faulting_app(message: &'static str) -> impl Application {
    application_fn(move |scope, _receive, send| async move {
        if scope.as_http().is_none() {
            return Ok(());
        }
        send.send(Message::response_start(500, Vec::new()))?;
        anyhow::bail!(message)
    })
}

/// Count requests in the shared state under `hits` and answer with the count.
#[must_use]
pub fn state_counter_app() -> impl Application {
    application_fn(|scope, _receive, send| async move {
        if scope.as_http().is_none() {
            return Ok(());
        }
        let hits = scope
            .state()
            .get("hits")
            .and_then(|value| value.as_u64())
            .unwrap_or(0)
            + 1;
        scope.state().insert("hits", hits);

        send.send(Message::response_start(200, vec![content_type("text/plain")]))?;
        send.send(Message::response_body(hits.to_string().into_bytes()))?;
        Ok(())
    })
}

/// Raise `error` as soon as startup is requested; serve HTTP with `http`.
#[must_use]
pub fn failing_startup_app(http: impl Application) -> impl Application {
    let http = Arc::new(http);
    application_fn(move |scope, mut receive, send| {
        let http = Arc::clone(&http);
        async move {
            if scope.as_http().is_some() {
                return http.call(scope, receive, send).await;
            }
            loop {
                if receive.recv().await? == Message::LifespanStartup {
                    anyhow::bail!("error");
                }
            }
        }
    })
}

/// Counts completed lifespan handshakes.
///
/// Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct LifespanProbe {
    startups: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
    conversations: Arc<AtomicUsize>,
}

impl LifespanProbe {
    /// Create a probe with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times startup completed.
    #[must_use]
    pub fn startups(&self) -> usize {
        self.startups.load(Ordering::SeqCst)
    }

    /// How many times shutdown completed.
    #[must_use]
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// How many lifespan conversations were opened.
    #[must_use]
    pub fn conversations(&self) -> usize {
        self.conversations.load(Ordering::SeqCst)
    }

    /// Add a complete lifespan handshake in front of `http`.
    #[must_use]
    pub fn wrap(&self, http: impl Application) -> impl Application {
        let probe = self.clone();
        let http = Arc::new(http);
        application_fn(move |scope, mut receive, send| {
            let probe = probe.clone();
            let http = Arc::clone(&http);
            async move {
                if scope.as_http().is_some() {
                    return http.call(scope, receive, send).await;
                }
                probe.conversations.fetch_add(1, Ordering::SeqCst);
                loop {
                    match receive.recv().await? {
                        Message::LifespanStartup => {
                            send.send(Message::LifespanStartupComplete)?;
                            probe.startups.fetch_add(1, Ordering::SeqCst);
                        },
                        Message::LifespanShutdown => {
                            send.send(Message::LifespanShutdownComplete)?;
                            probe.shutdowns.fetch_add(1, Ordering::SeqCst);
                            return Ok(());
                        },
                        other => anyhow::bail!("unexpected '{}' in lifespan", other.kind()),
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ConversationTest;
    use serde_json::json;
    use vellox_core::{AppState, HttpScope, LifespanScope, Scope};

    fn http_scope() -> Scope {
        Scope::Http(HttpScope::builder("GET", "/").build())
    }

    #[test]
    fn test_json_app_responds() {
        ConversationTest::new(json_app(&json!({"Hello": "World"})))
            .with_scope(http_scope())
            .given_messages([Message::HttpRequest {
                body: Vec::new(),
                more_body: false,
            }])
            .then_messages(|messages| {
                assert_eq!(
                    messages,
                    [
                        Message::response_start(200, vec![content_type("application/json")]),
                        Message::response_body(br#"{"Hello":"World"}"#.to_vec()),
                    ]
                );
            })
            .run();
    }

    #[test]
    fn test_responders_ignore_lifespan() {
        ConversationTest::new(text_app("hi"))
            .with_scope(Scope::Lifespan(LifespanScope::new(AppState::new())))
            .given_messages([Message::LifespanStartup])
            .then_messages(|messages| assert!(messages.is_empty()))
            .then_outcome(|outcome| assert!(outcome.is_ok()))
            .run();
    }

    #[test]
    fn test_probe_counts_handshake() {
        let probe = LifespanProbe::new();
        ConversationTest::new(probe.wrap(text_app("hi")))
            .with_scope(Scope::Lifespan(LifespanScope::new(AppState::new())))
            .given_messages([Message::LifespanStartup, Message::LifespanShutdown])
            .then_messages(|messages| {
                assert_eq!(
                    messages,
                    [Message::LifespanStartupComplete, Message::LifespanShutdownComplete]
                );
            })
            .run();

        assert_eq!(probe.conversations(), 1);
        assert_eq!(probe.startups(), 1);
        assert_eq!(probe.shutdowns(), 1);
    }

    #[test]
    fn test_chunked_app_marks_last_chunk() {
        ConversationTest::new(chunked_app("text/plain", vec![b"a".to_vec(), b"b".to_vec()]))
            .with_scope(http_scope())
            .then_messages(|messages| {
                assert_eq!(messages.len(), 3);
                assert_eq!(messages[1], Message::response_chunk(b"a".to_vec()));
                assert_eq!(messages[2], Message::response_body(b"b".to_vec()));
            })
            .run();
    }

    #[test]
    fn test_failing_startup_raises() {
        ConversationTest::new(failing_startup_app(text_app("hi")))
            .with_scope(Scope::Lifespan(LifespanScope::new(AppState::new())))
            .given_messages([Message::LifespanStartup])
            .then_outcome(|outcome| {
                assert_eq!(outcome.as_ref().unwrap_err().to_string(), "error");
            })
            .run();
    }
}
