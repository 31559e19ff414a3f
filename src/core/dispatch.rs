//! # Single-handler invocation with panic isolation.
//!
//! ```text
//! invoke(handler, &msg)
//!     ├─► Ok(())          ──► delivered
//!     ├─► Err(e)          ──► returned to send() (collected)
//!     └─► panic
//!           ├─ isolate_panics = true  ──► HandlerError::Panicked (collected)
//!           └─ isolate_panics = false ──► unwinds into the sender
//! ```
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a handler uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::channels::Message;
use crate::error::HandlerError;
use crate::handlers::Handler;

/// Runs one handler to completion.
pub(crate) async fn invoke<M: Message>(
    handler: &dyn Handler<M>,
    message: &M,
    isolate_panics: bool,
) -> Result<(), HandlerError> {
    let fut = handler.handle(message);
    if !isolate_panics {
        return fut.await;
    }

    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic_err) => Err(HandlerError::Panicked {
            handler: handler.name().to_string(),
            info: panic_info(&*panic_err),
        }),
    }
}

fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerFn, HandlerRef};

    #[tokio::test]
    async fn test_ok_and_err_pass_through() {
        let ok: HandlerRef<u8> = HandlerFn::arc("ok", |_: u8| async { Ok(()) });
        let err: HandlerRef<u8> =
            HandlerFn::arc("err", |v: u8| async move { Err(HandlerError::fail(v)) });

        assert_eq!(invoke(ok.as_ref(), &1, true).await, Ok(()));
        assert_eq!(
            invoke(err.as_ref(), &9, true).await,
            Err(HandlerError::fail("9"))
        );
    }

    struct Boom;

    #[async_trait::async_trait]
    impl Handler<u8> for Boom {
        async fn handle(&self, message: &u8) -> Result<(), HandlerError> {
            if *message == 0 {
                panic!("kaboom");
            }
            panic!("bad value {message}");
        }

        fn name(&self) -> &str {
            "boom"
        }
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let err = invoke(&Boom, &0u8, true).await.unwrap_err();
        assert_eq!(
            err,
            HandlerError::Panicked {
                handler: "boom".into(),
                info: "kaboom".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        match invoke(&Boom, &3u8, true).await {
            Err(HandlerError::Panicked { info, .. }) => assert_eq!(info, "bad value 3"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    #[should_panic(expected = "kaboom")]
    async fn test_panic_propagates_when_not_isolated() {
        let _ = invoke(&Boom, &0u8, false).await;
    }
}
