//! Dynamic utilization model implementation: utilization starts at an
//! initial value and grows linearly with elapsed execution time.

use serde::Deserialize;

use crate::core::utilization::interface::UtilizationModel;

#[derive(Deserialize)]
pub struct DynamicUtilizationModel {
    pub initial_utilization: f64,
    /// Linear growth of the requested fraction per simulated second.
    #[serde(default)]
    pub utilization_increment_per_second: f64,
}

impl DynamicUtilizationModel {
    /// Make model from configuration string, for example
    /// `initial_utilization: 0.1\nutilization_increment_per_second: 0.05`.
    pub fn from_str(config: &str) -> Self {
        serde_yaml::from_str::<DynamicUtilizationModel>(config).unwrap()
    }
}

impl UtilizationModel for DynamicUtilizationModel {
    fn current_utilization(&mut self, elapsed_time: f64) -> f64 {
        (self.initial_utilization + self.utilization_increment_per_second * elapsed_time)
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::utilization::dynamic::DynamicUtilizationModel;
    use crate::core::utilization::interface::UtilizationModel;

    #[test]
    fn test_dynamic_model_growth_is_clipped() {
        let mut model = DynamicUtilizationModel::from_str(
            "initial_utilization: 0.1\nutilization_increment_per_second: 0.05",
        );
        assert_eq!(0.1, model.current_utilization(0.0));
        assert_eq!(0.35, model.current_utilization(5.0));
        assert_eq!(1.0, model.current_utilization(100.0));
    }

    #[test]
    fn test_dynamic_model_without_increment_is_constant() {
        let mut model = DynamicUtilizationModel::from_str("initial_utilization: 0.0125");
        assert_eq!(0.0125, model.current_utilization(0.0));
        assert_eq!(0.0125, model.current_utilization(500.0));
    }
}
