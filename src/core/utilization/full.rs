//! Full utilization model implementation: the consumer always requests all
//! of its allocated capacity.

use crate::core::utilization::interface::UtilizationModel;

pub struct FullUtilizationModel {}

impl UtilizationModel for FullUtilizationModel {
    fn current_utilization(&mut self, _elapsed_time: f64) -> f64 {
        1.0
    }
}
