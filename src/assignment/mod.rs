//! Exact assignment: the Hungarian solver and the weighted matcher built on
//! it (LQF, OCF, MWM and maximum-size matching).
//!
//! ```
//! use crossbar_match::assignment::MaxWeightMatcher;
//! use crossbar_match::types::{Matching, RequestMatrix};
//!
//! let requests = RequestMatrix::from_rows(&[
//!     vec![0, 0, 0],
//!     vec![5, 0, 1],
//!     vec![0, 3, 0],
//! ]).unwrap();
//! let spec = requests.spec();
//!
//! let m = MaxWeightMatcher::new(spec).run(&requests, 0, &Matching::new(spec));
//! assert_eq!(m.output_of(1), Some(0));
//! assert_eq!(m.output_of(2), Some(1));
//! assert!(!m.is_input_matched(0));
//! ```

pub mod solver;
pub mod weighted;

pub use solver::{Assignment, AssignmentSolver, CostMatrix};
pub use weighted::{MaxWeightMatcher, MAX_WEIGHT};
