//! Transactional access to a shared JSON document.
//!
//! [`TransactionalStore`] composes the in-process [`KeyedMutex`], the
//! cross-process lock and the atomic writer into `read`, `write`, `modify`
//! and `status`. These four operations are the whole persistence surface.
//!
//! Lock order is fixed: in-process queue first, then the cross-process lock.
//! Both are released on every exit path.
//!
//! [`KeyedMutex`]: crate::keyed_mutex::KeyedMutex

mod status;
mod transactional;


pub use status::{StoreStatus, format_size};
pub use transactional::{TransactionalStore, new_instance_id};
