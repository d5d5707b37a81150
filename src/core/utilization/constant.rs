//! Constant utilization model implementation.

use serde::Deserialize;

use crate::core::utilization::interface::UtilizationModel;

#[derive(Deserialize)]
pub struct ConstantUtilizationModel {
    usage: f64,
}

impl ConstantUtilizationModel {
    pub fn new(usage: f64) -> Self {
        Self { usage }
    }

    /// Make model from configuration string.
    /// Should be in the following form:
    /// ```
    /// use dslab_elastisim::core::utilization::interface::UtilizationModel;
    /// use dslab_elastisim::core::utilization::constant::ConstantUtilizationModel;
    ///
    /// let config = "usage: 0.75";
    /// let mut model = ConstantUtilizationModel::from_str(config);
    ///
    /// assert_eq!(0.75, model.current_utilization(32.5));
    /// ```
    ///
    pub fn from_str(config: &str) -> Self {
        serde_yaml::from_str::<ConstantUtilizationModel>(config).unwrap()
    }
}

impl UtilizationModel for ConstantUtilizationModel {
    fn current_utilization(&mut self, _elapsed_time: f64) -> f64 {
        self.usage
    }
}
