use std::cell::RefCell;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::error;
use tokio::sync::oneshot::Sender;

pub mod http;
pub mod model;
pub mod quadtree;

pub use model::{SceneItem, SceneModel};
pub use quadtree::{Bounded, QuadTree, QuadTreeConfig, QuadTreeError, Rect, Uid};


struct ServerControl {
    stop_signal: Sender<()>,
    handle: JoinHandle<()>,
}


thread_local! {
    static SERVER_CONTROL: RefCell<Option<ServerControl>> = const { RefCell::new(None) };
}


/// Starts the http service with a default-configured tree on a background thread.
/// Returns false if it is already running on this thread.
#[no_mangle]
pub extern "C" fn start_quadtree_server(port: u16) -> bool {
    SERVER_CONTROL.with(|control| {
        if control.borrow().is_some() {
            return false;
        }

        match run_service(QuadTreeConfig::default(), port) {
            Some(server) => {
                control.replace(Some(server));
                true
            }
            None => false,
        }
    })
}


#[no_mangle]
pub extern "C" fn stop_quadtree_server() -> bool {
    SERVER_CONTROL.with(|control| {
        let Some(control) = control.replace(None) else {
            return false;
        };

        // the receiver is gone if the service has already exited
        let _ = control.stop_signal.send(());
        if control.handle.join().is_err() {
            error!("http service thread panicked");
        }
        true
    })
}


fn run_service(config: QuadTreeConfig, port: u16) -> Option<ServerControl> {
    let scene = match SceneModel::new(config) {
        Ok(scene) => Arc::new(scene),
        Err(err) => {
            error!("cannot create scene: {err}");
            return None;
        }
    };
    let (http_stop_tx, http_stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = std::thread::spawn(move || {
        http::http_server_service(scene, port, http_stop_rx);
    });

    Some(ServerControl{
        stop_signal: http_stop_tx,
        handle,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_starts_once_and_stops_once() {
        assert!(!stop_quadtree_server());

        // port 0 binds an ephemeral port
        assert!(start_quadtree_server(0));
        assert!(!start_quadtree_server(0));

        assert!(stop_quadtree_server());
        assert!(!stop_quadtree_server());

        assert!(start_quadtree_server(0));
        assert!(stop_quadtree_server());
    }
}
