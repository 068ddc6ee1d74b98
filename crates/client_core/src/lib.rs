//! Client side of the guestbook: REST access, response caching, pagination
//! and the presenters that turn them into view signals.

pub mod api;
pub mod cache;
pub mod context;
pub mod dao;
pub mod outcome;
pub mod presenter;
pub mod replay;
pub mod signal;

pub use api::{GuestbookService, HttpGuestbookService};
pub use context::{AppContext, ContextOptions, CurrentUser, Schedulers, StaticCurrentUser};
pub use dao::{PostsDao, RecordSource};
pub use outcome::{FetchError, Outcome};
pub use presenter::{
    details::{DetailsPresenter, DetailsPresenters, PresentTrigger, PRESENT_TIMEOUT},
    main_list::{AdapterItem, MainPresenter},
};
pub use replay::{Replay, ReplayCell};
pub use signal::Signal;

#[cfg(test)]
#[path = "tests/fakes.rs"]
mod fakes;
