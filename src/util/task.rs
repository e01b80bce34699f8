//! Spawning helpers

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::error;

/// Spawn a task whose panic is logged instead of propagating.
/// `kind` names the task, `owner` is the session or player it serves.
pub fn spawn_isolated<F>(kind: &'static str, owner: impl Into<String>, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let owner = owner.into();
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            error!(
                task = kind,
                owner = %owner,
                panic = %panic_message(panic.as_ref()),
                "Task panicked"
            );
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panics_stay_inside_the_task() {
        let handle = spawn_isolated("test", "owner", async {
            panic!("boom");
        });
        // Outer task completes normally
        assert!(handle.await.is_ok());
    }

    #[test]
    fn panic_messages_are_extracted() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
    }
}
