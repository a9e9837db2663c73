use log::debug;

use crate::data::chemical::ChemicalProperties;
use crate::models::Model;
use crate::parameters::ParameterizeOptions;
use crate::PbtkError;

/// Reject chemicals the model was not built for.
///
/// Runs before any parameter is assembled. An excluded chemical is reported as
/// [PbtkError::NotApplicable], never as missing data.
pub fn check_applicability(
    model: &dyn Model,
    properties: &ChemicalProperties,
    options: &ParameterizeOptions,
) -> Result<(), PbtkError> {
    let not_applicable = |reason: String| PbtkError::NotApplicable {
        model: model.kind().to_string(),
        chemical: properties.identity.to_string(),
        reason,
    };

    if options.class_exclude {
        if let Some(class) = model
            .excluded_classes()
            .iter()
            .find(|class| properties.has_class(class))
        {
            return Err(not_applicable(format!("chemical class {} is excluded", class)));
        }
    }

    if options.physchem_exclude {
        if let (Some(limit), Some(log_henry)) = (model.log_henry_limit(), properties.log_henry) {
            if log_henry >= limit {
                return Err(not_applicable(format!(
                    "logHenry {} is at or above {}, too volatile",
                    log_henry, limit
                )));
            }
        }
    }

    debug!("{} passes {} applicability checks", properties.identity, model.kind());
    Ok(())
}
