#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod correspondence;
pub use correspondence::{CorrespondenceSet, SearchMethod};

mod error;
pub use error::RegistrationError;

mod estimation;
pub use estimation::{PointToPoint, TransformationEstimation};

mod registration;
pub use registration::{
    evaluate_registration, has_converged, registration_icp, ConvergenceCriteria,
    RegistrationResult,
};

mod search;
pub use search::{NearestNeighborSearch, NO_MATCH};

mod validate;
