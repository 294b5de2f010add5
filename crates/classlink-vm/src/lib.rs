//! # classlink-vm
//!
//! The link resolution engine: turns symbolic member references into linked
//! calls and field accesses.
//!
//! ## Subsystems
//!
//! - **Resolver** (`resolver/`): member lookup, method and field resolution,
//!   and dispatch for static, special, virtual, interface, and handle calls.
//! - **Access** (`access`): class and member accessibility rules.
//! - **Loader Constraints** (`constraints`): cross-loader type identity and
//!   loader dependency edges.
//! - **Bootstrap** (`bootstrap`): the collaborator for dynamic call sites and
//!   generic method handle invokers.
//! - **Intrinsics** (`intrinsics`): the shared signature-polymorphic adapter table.
//! - **Statics** (`statics`): once-only, superclass-first type initialization.
//! - **Call Sites** (`call_site`): publish-once result slots.
pub mod access;
pub mod bootstrap;
pub mod call_info;
pub mod call_site;
pub mod config;
pub mod constraints;
pub mod error;
pub mod intrinsics;
pub mod metrics;
pub mod resolver;
pub mod state;
pub mod statics;

pub use bootstrap::{Bootstrap, BootstrapSpecifier, DynamicTarget};
pub use call_info::{DispatchKind, ResolvedCall};
pub use call_site::{CallSite, CallSiteEntry};
pub use config::LinkerConfig;
pub use error::{BootstrapError, LinkError, LinkErrorKind};
pub use resolver::{FieldAccess, FieldAccessKind, InvokeKind, LinkInfo, LinkResolver, MemberRef};
pub use state::SharedLinkState;
