//! Interface for cloudlet resource utilization models.

use serde::{Deserialize, Serialize};

use crate::core::utilization::constant::ConstantUtilizationModel;
use crate::core::utilization::dynamic::DynamicUtilizationModel;
use crate::core::utilization::full::FullUtilizationModel;

/// Utilization model is a method which defines the fraction of the capacity
/// allocated to a consumer that the consumer requests at the moment
/// `elapsed_time`, counted from the start of its execution.
pub trait UtilizationModel {
    fn current_utilization(&mut self, elapsed_time: f64) -> f64;
}

/// Config describes model name and configuration in arbitrary format which
/// certain implementation of `UtilizationModel` must be able to parse in
/// form of a yaml string.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct UtilizationModelConfig {
    pub model_name: String,
    #[serde(default)]
    pub config: String,
}

pub fn resolve_utilization_model(model_config: &UtilizationModelConfig) -> Box<dyn UtilizationModel> {
    match &model_config.model_name as &str {
        "full" => Box::new(FullUtilizationModel {}),
        "constant" => Box::new(ConstantUtilizationModel::from_str(&model_config.config)),
        "dynamic" => Box::new(DynamicUtilizationModel::from_str(&model_config.config)),
        _ => panic!(
            "Unsupported utilization model implementation {:?}",
            model_config.model_name
        ),
    }
}
