// Graph Store Domain Models
//
// Pure value types shared by the store, the publisher and the derived views.

pub mod events;
pub mod view;

pub use events::{GraphEvent, GraphId, GraphStats, SubscriptionId};
pub use view::{PublishedView, ViewChange};
