//! Attribute resolution and change propagation for parametric scene graphs.
//!
//! A scene is a tree of [`Root`]s. Each root owns child lists whose entries
//! carry a per-list [`Uid`] and a name. Downstreams (formulas) resolve
//! attributes by name or by `__<uid>` key; every lookup that fails is
//! written to the root's [`LookupLedger`], and when the missing name later
//! appears, disappears or changes, [`RootCore::changed`] queues exactly the
//! downstreams that were waiting on it.
//!
//! Queuing only schedules work. [`Root::flush_queue`] drains the queue in
//! rounds until nothing is left or the configured round limit is hit.
//!
//! ```
//! use strand::{builtin, Root, Scene, Value};
//!
//! let mut scene = Scene::new();
//! scene.add_node("a", "point3d")?;
//! scene.set_formula("a", "y", &["x"], builtin("neg").unwrap())?;
//! scene.flush_queue()?;
//! assert_eq!(scene.value("a.y")?, None);
//!
//! scene.set_literal("a", "x", Value::Float(2.0))?;
//! scene.flush_queue()?;
//! assert_eq!(scene.value("a.y")?, Some(Value::Float(-2.0).into_ref()));
//! # Ok::<(), strand::AttrError>(())
//! ```

pub mod child;
pub mod config;
pub mod downstream;
pub mod error;
pub mod flags;
pub mod host;
pub mod ledger;
pub mod name;
pub mod queue;
pub mod root;
pub mod scene;
pub mod subscription;
pub mod value;

pub use child::{Child, ChildList, Uid};
pub use config::SceneConfig;
pub use downstream::{DownstreamId, Registry};
pub use error::{AttrError, ConfigError, HostError};
pub use flags::AttrFlags;
pub use host::{builtin, host, HostFn, BUILTINS};
pub use ledger::LookupLedger;
pub use name::{is_name_valid, is_uid_key, uid_key, Key};
pub use queue::{Change, DirtyQueue, EvalQueue, QueueEntry};
pub use root::{FlushReport, Root, RootCore};
pub use scene::{DatumSource, DatumState, Node, Reference, Scene, SceneSnapshot};
pub use subscription::{DatumAddr, SubscriptionTable};
pub use value::{Value, ValueRef};
