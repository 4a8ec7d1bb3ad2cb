use types::{BranchName, SessionToken};

mod handler;
mod http;
mod poller;

pub use handler::{CountHandler, EmptyHandler, ErasedHandler, PollEvent};
pub use http::Http;
pub use poller::{Poller, PollerCommand};

pub struct Client {
    pub poller: Poller,
    pub http: Http,
}

impl Client {
    pub fn new(token: SessionToken, branch: BranchName) -> Self {
        Self {
            http: Http::new(token.clone()),
            poller: Poller::new(token, branch),
        }
    }

    pub fn with_handler(self, handler: Box<dyn ErasedHandler>) -> Self {
        Self {
            poller: self.poller.with_handler(handler),
            ..self
        }
    }
}
