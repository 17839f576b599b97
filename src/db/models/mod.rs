pub mod analysis;
pub mod capsule;
pub mod delivery;
pub mod fragment;

pub use analysis::StoredAnalysis;
pub use capsule::{Capsule, CapsuleInput};
pub use delivery::{Delivery, DeliveryChannel, DeliveryInput, DeliveryStatus};
pub use fragment::{Fragment, NewFragment};
