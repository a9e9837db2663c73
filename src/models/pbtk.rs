//! Flow-limited whole-body PBTK model
//!
//! Compartments: gut lumen, gut, liver, venous blood, lung, arterial blood, rest of
//! body and kidney, plus accumulators for renal filtration, hepatic metabolism and
//! plasma AUC. Blood leaving a tissue is at `C_t Rblood2plasma / (Kt2pu fup)`.

use crate::data::chemical::ChemicalProperties;
use crate::data::physiology::{PhysiologyProfile, Tissue};
use crate::models::{
    positive_fup, CompartmentSystem, Model, ModelKind, OutputColumn, OutputKind,
};
use crate::parameters::{check_applicability, Assembly, Param, ParameterSet, ParameterizeOptions};
use crate::simulator::Route;
use crate::PbtkError;

pub(crate) const REQUIRED: [Param; 24] = [
    Param::BodyWeight,
    Param::MolecularWeight,
    Param::FunboundPlasma,
    Param::Rblood2plasma,
    Param::Kgutabs,
    Param::Fabsgut,
    Param::ClintScaled,
    Param::Qcardiacc,
    Param::Qgfrc,
    Param::Qgutf,
    Param::Qliverf,
    Param::Qkidneyf,
    Param::Vartc,
    Param::Vvenc,
    Param::Vgutc,
    Param::Vliverc,
    Param::Vkidneyc,
    Param::Vlungc,
    Param::Vrestc,
    Param::Kgut2pu,
    Param::Kliver2pu,
    Param::Kkidney2pu,
    Param::Klung2pu,
    Param::Krest2pu,
];

pub(crate) const GUT_LUMEN: usize = 0;
pub(crate) const GUT: usize = 1;
pub(crate) const LIVER: usize = 2;
pub(crate) const VEN: usize = 3;
pub(crate) const LUNG: usize = 4;
pub(crate) const ART: usize = 5;
pub(crate) const REST: usize = 6;
pub(crate) const KIDNEY: usize = 7;
pub(crate) const TUBULES: usize = 8;
pub(crate) const METABOLIZED: usize = 9;
pub(crate) const AUC: usize = 10;
pub(crate) const INHALED: usize = 11;
pub(crate) const EXHALED: usize = 12;

const STATES: [&str; 11] = [
    "Agutlumen",
    "Agut",
    "Aliver",
    "Aven",
    "Alung",
    "Aart",
    "Arest",
    "Akidney",
    "Atubules",
    "Ametabolized",
    "AUC",
];

const GAS_STATES: [&str; 13] = [
    "Agutlumen",
    "Agut",
    "Aliver",
    "Aven",
    "Alung",
    "Aart",
    "Arest",
    "Akidney",
    "Atubules",
    "Ametabolized",
    "AUC",
    "Ainh",
    "Aexh",
];

const OUTPUTS: [OutputColumn; 19] = [
    OutputColumn::new("Agutlumen", OutputKind::Amount),
    OutputColumn::new("Agut", OutputKind::Amount),
    OutputColumn::new("Aliver", OutputKind::Amount),
    OutputColumn::new("Aven", OutputKind::Amount),
    OutputColumn::new("Alung", OutputKind::Amount),
    OutputColumn::new("Aart", OutputKind::Amount),
    OutputColumn::new("Arest", OutputKind::Amount),
    OutputColumn::new("Akidney", OutputKind::Amount),
    OutputColumn::new("Atubules", OutputKind::Amount),
    OutputColumn::new("Ametabolized", OutputKind::Amount),
    OutputColumn::new("Cgut", OutputKind::Concentration),
    OutputColumn::new("Cliver", OutputKind::Concentration),
    OutputColumn::new("Cven", OutputKind::Concentration),
    OutputColumn::new("Clung", OutputKind::Concentration),
    OutputColumn::new("Cart", OutputKind::Concentration),
    OutputColumn::new("Crest", OutputKind::Concentration),
    OutputColumn::new("Ckidney", OutputKind::Concentration),
    OutputColumn::new("Cplasma", OutputKind::Concentration),
    OutputColumn::new("AUC", OutputKind::Auc),
];

const GAS_OUTPUTS: [OutputColumn; 23] = [
    OutputColumn::new("Agutlumen", OutputKind::Amount),
    OutputColumn::new("Agut", OutputKind::Amount),
    OutputColumn::new("Aliver", OutputKind::Amount),
    OutputColumn::new("Aven", OutputKind::Amount),
    OutputColumn::new("Alung", OutputKind::Amount),
    OutputColumn::new("Aart", OutputKind::Amount),
    OutputColumn::new("Arest", OutputKind::Amount),
    OutputColumn::new("Akidney", OutputKind::Amount),
    OutputColumn::new("Atubules", OutputKind::Amount),
    OutputColumn::new("Ametabolized", OutputKind::Amount),
    OutputColumn::new("Ainh", OutputKind::Amount),
    OutputColumn::new("Aexh", OutputKind::Amount),
    OutputColumn::new("Cgut", OutputKind::Concentration),
    OutputColumn::new("Cliver", OutputKind::Concentration),
    OutputColumn::new("Cven", OutputKind::Concentration),
    OutputColumn::new("Clung", OutputKind::Concentration),
    OutputColumn::new("Cart", OutputKind::Concentration),
    OutputColumn::new("Crest", OutputKind::Concentration),
    OutputColumn::new("Ckidney", OutputKind::Concentration),
    OutputColumn::new("Cplasma", OutputKind::Concentration),
    OutputColumn::new("Cendexh", OutputKind::AirConcentration),
    OutputColumn::new("Cmixexh", OutputKind::AirConcentration),
    OutputColumn::new("AUC", OutputKind::Auc),
];

/// Fraction of exhaled air that comes from the alveoli; the rest is dead space
const ALVEOLAR_FRACTION: f64 = 0.7;

/// Full PBTK model for oral and intravenous dosing
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbtk;

impl Model for Pbtk {
    fn kind(&self) -> ModelKind {
        ModelKind::Pbtk
    }

    fn required_parameters(&self) -> &'static [Param] {
        &REQUIRED
    }

    fn parameterize(
        &self,
        properties: &ChemicalProperties,
        physiology: &PhysiologyProfile,
        options: &ParameterizeOptions,
    ) -> Result<ParameterSet, PbtkError> {
        check_applicability(self, properties, options)?;
        let assembly = Assembly::build(properties, physiology, options)?;
        let values = assembly.pbtk_values(physiology, options)?;
        Ok(ParameterSet::new(self.kind(), values)?
            .with_derivation(assembly.partition, assembly.warnings))
    }

    fn css_plasma(&self, params: &ParameterSet, dose_rate: f64) -> Result<f64, PbtkError> {
        let network = Network::from_params(params, None)?;
        Ok(network.css_plasma(dose_rate * network.body_weight))
    }

    fn compartment_partition(&self, params: &ParameterSet, tissue: Tissue) -> Option<f64> {
        compartment_partition(params, tissue)
    }

    fn system(&self, params: &ParameterSet) -> Result<Box<dyn CompartmentSystem>, PbtkError> {
        Ok(Box::new(Network::from_params(params, None)?))
    }
}

pub(crate) fn compartment_partition(params: &ParameterSet, tissue: Tissue) -> Option<f64> {
    let param = match tissue {
        Tissue::Gut => Param::Kgut2pu,
        Tissue::Liver => Param::Kliver2pu,
        Tissue::Kidney => Param::Kkidney2pu,
        Tissue::Lung => Param::Klung2pu,
        _ => return None,
    };
    params.try_get(param)
}

/// Lung gas exchange of the inhalation model
#[derive(Debug, Clone, Copy)]
pub(crate) struct GasExchange {
    /// Alveolar ventilation (L/h)
    pub qalv: f64,
    pub kblood2air: f64,
}

/// Absolute flows (L/h), volumes (L) and clearances of the PBTK network
#[derive(Debug, Clone)]
pub(crate) struct Network {
    pub body_weight: f64,
    fup: f64,
    rblood2plasma: f64,
    kgutabs: f64,
    fabsgut: f64,
    clmetabolism: f64,
    qcardiac: f64,
    qgfr: f64,
    qgut: f64,
    qliver: f64,
    qkidney: f64,
    qrest: f64,
    vart: f64,
    vven: f64,
    vgut: f64,
    vliver: f64,
    vkidney: f64,
    vlung: f64,
    vrest: f64,
    kgut: f64,
    kliver: f64,
    kkidney: f64,
    klung: f64,
    krest: f64,
    gas: Option<GasExchange>,
}

fn positive(name: &str, value: f64) -> Result<f64, PbtkError> {
    if value.is_nan() || value <= 0.0 {
        return Err(PbtkError::domain(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(value)
}

impl Network {
    pub(crate) fn from_params(
        params: &ParameterSet,
        gas: Option<GasExchange>,
    ) -> Result<Self, PbtkError> {
        let bw = params.get(Param::BodyWeight)?;
        let scale = bw.powf(0.75);
        let qcardiac = params.get(Param::Qcardiacc)? * scale;
        let qgut = params.get(Param::Qgutf)? * qcardiac;
        let qliver = params.get(Param::Qliverf)? * qcardiac;
        let qkidney = params.get(Param::Qkidneyf)? * qcardiac;
        let qrest = qcardiac - qgut - qliver - qkidney;
        if qrest < 0.0 {
            return Err(PbtkError::domain(format!(
                "organ flows exceed cardiac output by {} L/h",
                -qrest
            )));
        }
        let volume = |param: Param| -> Result<f64, PbtkError> {
            positive(param.name(), params.get(param)? * bw)
        };
        let coefficient =
            |param: Param| -> Result<f64, PbtkError> { positive(param.name(), params.get(param)?) };

        Ok(Self {
            body_weight: bw,
            fup: positive_fup(params)?,
            rblood2plasma: positive("Rblood2plasma", params.get(Param::Rblood2plasma)?)?,
            kgutabs: params.get(Param::Kgutabs)?,
            fabsgut: params.get(Param::Fabsgut)?,
            clmetabolism: params.get(Param::ClintScaled)? * bw,
            qcardiac: positive("Qcardiac", qcardiac)?,
            qgfr: params.get(Param::Qgfrc)? * scale,
            qgut,
            qliver,
            qkidney,
            qrest,
            vart: volume(Param::Vartc)?,
            vven: volume(Param::Vvenc)?,
            vgut: volume(Param::Vgutc)?,
            vliver: volume(Param::Vliverc)?,
            vkidney: volume(Param::Vkidneyc)?,
            vlung: volume(Param::Vlungc)?,
            vrest: volume(Param::Vrestc)?,
            kgut: coefficient(Param::Kgut2pu)?,
            kliver: coefficient(Param::Kliver2pu)?,
            kkidney: coefficient(Param::Kkidney2pu)?,
            klung: coefficient(Param::Klung2pu)?,
            krest: coefficient(Param::Krest2pu)?,
            gas,
        })
    }

    /// Blood concentration leaving a tissue at concentration `c`
    fn venous(&self, c: f64, k: f64) -> f64 {
        c * self.rblood2plasma / (k * self.fup)
    }

    /// Plasma Css (mg/L) for a constant oral input `rate` (mg/h)
    pub(crate) fn css_plasma(&self, rate: f64) -> f64 {
        let absorbed = rate * self.fabsgut;
        let qtl = self.qgut + self.qliver;
        let a = self.clmetabolism * self.fup / self.rblood2plasma;
        let b = self.qgfr * self.fup / self.rblood2plasma;
        let c = match self.gas {
            Some(gas) => self.qcardiac / (self.qcardiac + gas.qalv / gas.kblood2air),
            None => 1.0,
        };
        let coefficient = self.qcardiac / c
            - qtl * qtl / (qtl + a)
            - self.qkidney * self.qkidney / (self.qkidney + b)
            - (self.qcardiac - qtl - self.qkidney);
        let arterial = qtl * absorbed / (qtl + a) / coefficient;
        arterial / c / self.rblood2plasma
    }
}

impl CompartmentSystem for Network {
    fn states(&self) -> &'static [&'static str] {
        if self.gas.is_some() {
            &GAS_STATES
        } else {
            &STATES
        }
    }

    fn outputs(&self) -> &'static [OutputColumn] {
        if self.gas.is_some() {
            &GAS_OUTPUTS
        } else {
            &OUTPUTS
        }
    }

    fn dose_state(&self, route: Route) -> Result<usize, PbtkError> {
        match route {
            Route::Oral => Ok(GUT_LUMEN),
            Route::Iv => Ok(VEN),
            Route::Inhalation => Err(PbtkError::domain(
                "inhalation exposure is given as a forcing series, not as doses",
            )),
        }
    }

    fn dose_fraction(&self, route: Route) -> f64 {
        match route {
            Route::Oral => self.fabsgut,
            _ => 1.0,
        }
    }

    fn accepts_forcing(&self) -> bool {
        self.gas.is_some()
    }

    fn rhs(&self, x: &[f64], forcing: f64, dx: &mut [f64]) {
        let cgut = x[GUT] / self.vgut;
        let cliver = x[LIVER] / self.vliver;
        let cven = x[VEN] / self.vven;
        let clung = x[LUNG] / self.vlung;
        let cart = x[ART] / self.vart;
        let crest = x[REST] / self.vrest;
        let ckidney = x[KIDNEY] / self.vkidney;

        let out_gut = self.venous(cgut, self.kgut);
        let out_liver = self.venous(cliver, self.kliver);
        let out_lung = self.venous(clung, self.klung);
        let out_rest = self.venous(crest, self.krest);
        let out_kidney = self.venous(ckidney, self.kkidney);

        let absorption = self.kgutabs * x[GUT_LUMEN];
        let metabolism = self.clmetabolism * cliver / self.kliver;
        let filtration = self.qgfr * ckidney / self.kkidney;
        let qtl = self.qgut + self.qliver;

        dx[GUT_LUMEN] = -absorption;
        dx[GUT] = absorption + self.qgut * (cart - out_gut);
        dx[LIVER] = self.qliver * cart + self.qgut * out_gut - qtl * out_liver - metabolism;
        dx[VEN] = qtl * out_liver + self.qkidney * out_kidney + self.qrest * out_rest
            - self.qcardiac * cven;
        dx[LUNG] = self.qcardiac * (cven - out_lung);
        dx[ART] = self.qcardiac * (out_lung - cart);
        dx[REST] = self.qrest * (cart - out_rest);
        dx[KIDNEY] = self.qkidney * (cart - out_kidney) - filtration;
        dx[TUBULES] = filtration;
        dx[METABOLIZED] = metabolism;
        dx[AUC] = cven / self.rblood2plasma;

        if let Some(gas) = self.gas {
            let alveolar = out_lung / gas.kblood2air;
            dx[LUNG] += gas.qalv * (forcing - alveolar);
            dx[INHALED] = gas.qalv * forcing;
            dx[EXHALED] = gas.qalv * alveolar;
        }
    }

    fn observe(&self, x: &[f64], forcing: f64, y: &mut [f64]) {
        let mut i = 0;
        let mut push = |value: f64| {
            y[i] = value;
            i += 1;
        };
        for state in GUT_LUMEN..=METABOLIZED {
            push(x[state]);
        }
        if self.gas.is_some() {
            push(x[INHALED]);
            push(x[EXHALED]);
        }
        let cven = x[VEN] / self.vven;
        push(x[GUT] / self.vgut);
        push(x[LIVER] / self.vliver);
        push(cven);
        push(x[LUNG] / self.vlung);
        push(x[ART] / self.vart);
        push(x[REST] / self.vrest);
        push(x[KIDNEY] / self.vkidney);
        push(cven / self.rblood2plasma);
        if let Some(gas) = self.gas {
            let end_exhaled = self.venous(x[LUNG] / self.vlung, self.klung) / gas.kblood2air;
            push(end_exhaled);
            push(ALVEOLAR_FRACTION * end_exhaled + (1.0 - ALVEOLAR_FRACTION) * forcing);
        }
        push(x[AUC]);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    pub(crate) fn values() -> BTreeMap<Param, f64> {
        [
            (Param::BodyWeight, 70.0),
            (Param::MolecularWeight, 200.0),
            (Param::FunboundPlasma, 0.2),
            (Param::Rblood2plasma, 0.9),
            (Param::Kgutabs, 2.18),
            (Param::Fabsgut, 1.0),
            (Param::ClintScaled, 0.05),
            (Param::Qcardiacc, 15.6),
            (Param::Qgfrc, 0.31),
            (Param::Qgutf, 0.205),
            (Param::Qliverf, 0.065),
            (Param::Qkidneyf, 0.19),
            (Param::Vartc, 0.0255),
            (Param::Vvenc, 0.051),
            (Param::Vgutc, 0.0171),
            (Param::Vliverc, 0.0245),
            (Param::Vkidneyc, 0.0044),
            (Param::Vlungc, 0.0076),
            (Param::Vrestc, 0.76),
            (Param::Kgut2pu, 3.0),
            (Param::Kliver2pu, 4.0),
            (Param::Kkidney2pu, 3.5),
            (Param::Klung2pu, 2.0),
            (Param::Krest2pu, 2.5),
        ]
        .into_iter()
        .collect()
    }

    fn params() -> ParameterSet {
        ParameterSet::new(ModelKind::Pbtk, values()).unwrap()
    }

    #[test]
    fn network_conserves_mass() {
        let system = Pbtk.system(&params()).unwrap();
        let x: Vec<f64> = (0..11).map(|i| 1.0 + i as f64).collect();
        let mut dx = vec![0.0; 11];
        system.rhs(&x, 0.0, &mut dx);
        let total: f64 = dx[..AUC].iter().sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn analytic_css_balances_the_network() {
        // At the analytic steady state every tissue compartment is stationary
        let params = params();
        let network = Network::from_params(&params, None).unwrap();
        let rate = 2.0;
        let cplasma = network.css_plasma(rate);
        assert!(cplasma > 0.0);

        let cart = cplasma * network.rblood2plasma;
        let qtl = network.qgut + network.qliver;
        let a = network.clmetabolism * network.fup / network.rblood2plasma;
        let b = network.qgfr * network.fup / network.rblood2plasma;
        let out_liver = (qtl * cart + rate) / (qtl + a);
        let out_kidney = network.qkidney * cart / (network.qkidney + b);
        let venous_return = (qtl * out_liver
            + network.qkidney * out_kidney
            + network.qrest * cart)
            / network.qcardiac;
        assert_relative_eq!(venous_return, cart, max_relative = 1e-10);
    }

    #[test]
    fn zero_fup_is_rejected() {
        let params = params().with_value(Param::FunboundPlasma, 0.0);
        assert!(matches!(Pbtk.css_plasma(&params, 1.0), Err(PbtkError::Domain(_))));
    }

    #[test]
    fn compartment_coefficients_come_from_the_set() {
        assert_eq!(Pbtk.compartment_partition(&params(), Tissue::Liver), Some(4.0));
        assert_eq!(Pbtk.compartment_partition(&params(), Tissue::Adipose), None);
    }
}
