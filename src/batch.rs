//! Steady-state concentrations for many chemicals in parallel

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;

use crate::data::chemical::ChemicalQuery;
use crate::data::physiology::Species;
use crate::data::store::PropertyStore;
use crate::models::ModelKind;
use crate::parameters::{ChemicalInput, ParameterizeOptions};
use crate::steady_state::{calc_css, CssOptions, CssResult};
use crate::PbtkError;

/// Outcome for one chemical of a batch
#[derive(Debug)]
pub struct BatchEntry {
    pub query: ChemicalQuery,
    pub result: Result<CssResult, PbtkError>,
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}

/// Analytic Css of every chemical in `queries`, in input order.
///
/// A chemical that fails does not stop the batch; its error is kept in its entry.
pub fn css_batch(
    store: &dyn PropertyStore,
    queries: &[ChemicalQuery],
    model: ModelKind,
    species: Species,
    options: &CssOptions,
    parameterize_options: &ParameterizeOptions,
    show_progress: bool,
) -> Vec<BatchEntry> {
    let bar = progress_bar(queries.len(), show_progress);
    let entries: Vec<BatchEntry> = queries
        .par_iter()
        .map(|query| {
            let input = ChemicalInput::query(query.clone());
            let result = calc_css(store, &input, model, species, options, parameterize_options);
            if let Err(err) = &result {
                warn!("{}: {}", query, err);
            }
            bar.inc(1);
            BatchEntry {
                query: query.clone(),
                result,
            }
        })
        .collect();
    bar.finish_and_clear();

    let failed = entries.iter().filter(|e| e.result.is_err()).count();
    info!(
        "Css batch for {} chemicals with the {} model: {} failed",
        entries.len(),
        model,
        failed
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::chemical::{ChemicalIdentity, PropertyValue};
    use crate::data::store::{ChemicalRecord, InMemoryStore, Property};

    fn store() -> InMemoryStore {
        InMemoryStore::new().with_chemical(
            ChemicalRecord::new(ChemicalIdentity::new("80-05-7", "Bisphenol A"))
                .physchem(Property::LogP, 3.32)
                .physchem(Property::MolecularWeight, 228.29)
                .physchem(Property::PkaDonor, PropertyValue::List(vec![9.78, 10.39]))
                .measured(Species::Human, Property::FunboundPlasma, 0.0385)
                .measured(Species::Human, Property::Clint, 12.1),
        )
    }

    #[test]
    fn failures_stay_with_their_chemical() {
        let queries = vec![
            ChemicalQuery::cas("80-05-7"),
            ChemicalQuery::cas("0-00-0"),
            ChemicalQuery::name("Bisphenol A"),
        ];
        let entries = css_batch(
            &store(),
            &queries,
            ModelKind::ThreeCompartmentSs,
            Species::Human,
            &CssOptions::default(),
            &ParameterizeOptions::default(),
            false,
        );
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].query, queries[1]);
        assert!(matches!(entries[1].result, Err(PbtkError::Identity(_))));
        let first = entries[0].result.as_ref().unwrap().value;
        let third = entries[2].result.as_ref().unwrap().value;
        assert_eq!(first, third);
    }
}
