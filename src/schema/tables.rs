//! Field tables for every equipment category and element type.

use super::{Field, Item, Table};
use crate::model::{Category, ElementType};

use super::FieldType::{
    Any, Bool, List, Nested, NullableNumber, Number, NumberOrList, NumberOrNested, Object, OneOf,
    Str,
};

pub static FREQUENCY_SERIES: Table = Table {
    name: "frequency_series",
    fields: &[
        Field::required("value", List(Item::Number)),
        Field::required("frequency", List(Item::Number)),
    ],
    any_of: &[],
};

pub static LUMPED_LOSS: Table = Table {
    name: "lumped_loss",
    fields: &[
        Field::required("position", Number),
        Field::required("loss", Number),
    ],
    any_of: &[],
};

pub static RAMAN_PUMP: Table = Table {
    name: "raman_pump",
    fields: &[
        Field::required("power", Number),
        Field::required("frequency", Number),
        Field::required("propagation_direction", OneOf(&["coprop", "counterprop"])),
    ],
    any_of: &[],
};

pub static RESTRICTIONS: Table = Table {
    name: "restrictions",
    fields: &[
        Field::required("preamp_variety_list", List(Item::Str)),
        Field::required("booster_variety_list", List(Item::Str)),
    ],
    any_of: &[],
};

pub static FREQUENCY_RANGE: Table = Table {
    name: "frequency",
    fields: &[Field::required("min", Number), Field::required("max", Number)],
    any_of: &[],
};

pub static PENALTY: Table = Table {
    name: "penalty",
    fields: &[
        Field::optional("chromatic_dispersion", Number),
        Field::optional("pmd", Number),
        Field::optional("pdl", Number),
        Field::required("penalty_value", Number),
    ],
    any_of: &["chromatic_dispersion", "pmd", "pdl"],
};

pub static MODE: Table = Table {
    name: "mode",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("format", Str),
        Field::optional("baud_rate", Number),
        Field::optional("OSNR", Number),
        Field::optional("bit_rate", Number),
        Field::optional("roll_off", NullableNumber),
        Field::optional("tx_osnr", Number),
        Field::optional("penalties", List(Item::Nested(&PENALTY))),
        Field::optional("min_spacing", Number),
        Field::optional("cost", Number),
    ],
    any_of: &[],
};

pub static BAND: Table = Table {
    name: "band",
    fields: &[Field::required("f_min", Number), Field::required("f_max", Number)],
    any_of: &[],
};

// Per-type element `params` blocks. Equipment templates use the same
// tables for their own `params`.

pub static FIBER_PARAMS: Table = Table {
    name: "fiber_params",
    fields: &[
        Field::optional("length", Number),
        Field::optional("length_units", OneOf(&["m", "km"])),
        Field::optional("loss_coef", NumberOrNested(&FREQUENCY_SERIES)),
        Field::optional("att_in", Number),
        Field::optional("con_in", Number),
        Field::optional("con_out", Number),
        Field::optional("pmd_coef", Number),
        Field::optional("dispersion", Number),
        Field::optional("effective_area", Number),
        Field::optional("gamma", Number),
        Field::optional("lumped_losses", List(Item::Nested(&LUMPED_LOSS))),
    ],
    any_of: &[],
};

pub static EDFA_PARAMS: Table = Table {
    name: "edfa_params",
    fields: &[
        Field::optional("f_min", Number),
        Field::optional("f_max", Number),
        Field::optional("type_def", Str),
        Field::optional("gain_flatmax", Number),
        Field::optional("gain_min", Number),
        Field::optional("p_max", Number),
        Field::optional("nf_min", Number),
        Field::optional("nf_max", Number),
        Field::optional("nf0", Number),
        Field::optional("out_voa_auto", Bool),
        Field::optional("allowed_for_design", Bool),
        Field::optional("nf_coef", List(Item::Number)),
        Field::optional("nf_fit_coeff", List(Item::Number)),
        Field::optional("dgt", NumberOrList),
        Field::optional("gain_ripple", NumberOrList),
        Field::optional("tilt_ripple", NumberOrList),
        Field::optional("nf_ripple", NumberOrList),
        Field::optional("f_ripple_ref", List(Item::Number)),
        Field::optional("pmd", Number),
        Field::optional("pdl", Number),
        Field::optional("preamp_variety", Str),
        Field::optional("booster_variety", Str),
    ],
    any_of: &[],
};

pub static ROADM_PARAMS: Table = Table {
    name: "roadm_params",
    fields: &[
        Field::optional("target_pch_out_db", Number),
        Field::optional("target_psd_out_mWperGHz", Number),
        Field::optional("target_out_mWperSlotWidth", Number),
        Field::optional("restrictions", Nested(&RESTRICTIONS)),
        Field::optional("per_degree_pch_out_db", Object),
        Field::optional("add_drop_osnr", Number),
        Field::optional("pmd", Number),
        Field::optional("pdl", Number),
    ],
    any_of: &[],
};

pub static TRANSCEIVER_PARAMS: Table = Table {
    name: "transceiver_params",
    fields: &[
        Field::optional("frequency", Nested(&FREQUENCY_RANGE)),
        Field::optional("tx_osnr", Number),
        Field::optional("baud_rate", Number),
    ],
    any_of: &[],
};

pub static FUSED_PARAMS: Table = Table {
    name: "fused_params",
    fields: &[Field::optional("loss", Number)],
    any_of: &[],
};

pub static MULTIBAND_PARAMS: Table = Table {
    name: "multiband_params",
    fields: &[
        Field::optional("f_min", Number),
        Field::optional("f_max", Number),
        Field::optional("allowed_for_design", Bool),
    ],
    any_of: &[],
};

pub static EDFA_OPERATIONAL: Table = Table {
    name: "edfa_operational",
    fields: &[
        Field::optional("gain_target", Number),
        Field::optional("tilt_target", Number),
        Field::optional("out_voa", Number),
        Field::optional("delta_p", NullableNumber),
        Field::optional("in_voa", Number),
    ],
    any_of: &[],
};

pub static RAMAN_OPERATIONAL: Table = Table {
    name: "raman_operational",
    fields: &[
        Field::optional("temperature", Number),
        Field::optional("raman_pumps", List(Item::Nested(&RAMAN_PUMP))),
    ],
    any_of: &[],
};

pub static AMPLIFIER_SPEC: Table = Table {
    name: "amplifier",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("params", Nested(&EDFA_PARAMS)),
        Field::optional("operational", Nested(&EDFA_OPERATIONAL)),
    ],
    any_of: &[],
};

pub static ELEMENT: Table = Table {
    name: "element",
    fields: &[
        Field::optional("element_id", Str),
        Field::required(
            "type",
            OneOf(&[
                "Transceiver",
                "Fiber",
                "RamanFiber",
                "Edfa",
                "Roadm",
                "Multiband_amplifier",
                "Fused",
            ]),
        ),
        Field::required("name", Str),
        Field::required("metadata", Any),
        Field::optional("library_id", Str),
        Field::optional("type_variety", Str),
        Field::optional("params", Object),
        Field::optional("operational", Object),
        Field::optional("amplifiers", List(Item::Nested(&AMPLIFIER_SPEC))),
    ],
    any_of: &[],
};

// Equipment categories.

pub static EDFA: Table = Table {
    name: "Edfa",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("type_def", Str),
        Field::optional("gain_flatmax", Number),
        Field::optional("gain_min", Number),
        Field::optional("p_max", Number),
        Field::optional("nf_min", Number),
        Field::optional("nf_max", Number),
        Field::optional("out_voa_auto", Bool),
        Field::optional("allowed_for_design", Bool),
        Field::optional("params", Nested(&EDFA_PARAMS)),
    ],
    any_of: &[],
};

pub static FIBER: Table = Table {
    name: "Fiber",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("dispersion", Number),
        Field::optional("dispersion_slope", Number),
        Field::optional("dispersion_per_frequency", Nested(&FREQUENCY_SERIES)),
        Field::optional("effective_area", Number),
        Field::optional("gamma", Number),
        Field::optional("pmd_coef", Number),
        Field::optional("lumped_losses", List(Item::Nested(&LUMPED_LOSS))),
        Field::optional("raman_coefficient", Object),
        Field::optional("params", Nested(&FIBER_PARAMS)),
    ],
    any_of: &[],
};

pub static RAMAN_FIBER: Table = Table {
    name: "RamanFiber",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("dispersion", Number),
        Field::optional("dispersion_slope", Number),
        Field::optional("dispersion_per_frequency", Nested(&FREQUENCY_SERIES)),
        Field::optional("effective_area", Number),
        Field::optional("gamma", Number),
        Field::optional("pmd_coef", Number),
        Field::optional("lumped_losses", List(Item::Nested(&LUMPED_LOSS))),
        Field::optional("raman_coefficient", Object),
        Field::optional("raman_pumps", List(Item::Nested(&RAMAN_PUMP))),
        Field::optional("temperature", Number),
        Field::optional("loss_coef", Nested(&FREQUENCY_SERIES)),
        Field::optional("params", Nested(&FIBER_PARAMS)),
    ],
    any_of: &[],
};

pub static ROADM: Table = Table {
    name: "Roadm",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("target_pch_out_db", Number),
        Field::optional("add_drop_osnr", Number),
        Field::optional("pmd", Number),
        Field::optional("pdl", Number),
        Field::optional("restrictions", Nested(&RESTRICTIONS)),
        Field::optional("params", Nested(&ROADM_PARAMS)),
    ],
    any_of: &[],
};

pub static TRANSCEIVER: Table = Table {
    name: "Transceiver",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("frequency", Nested(&FREQUENCY_RANGE)),
        Field::optional("mode", List(Item::Nested(&MODE))),
        Field::optional("params", Nested(&TRANSCEIVER_PARAMS)),
    ],
    any_of: &[],
};

pub static MULTIBAND_AMPLIFIER: Table = Table {
    name: "Multiband_amplifier",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("type_def", Str),
        Field::optional("bands", List(Item::Nested(&BAND))),
        Field::optional("amplifiers", List(Item::Str)),
        Field::optional("allowed_for_design", Bool),
        Field::optional("params", Nested(&MULTIBAND_PARAMS)),
    ],
    any_of: &[],
};

pub static FUSED: Table = Table {
    name: "Fused",
    fields: &[
        Field::optional("type_variety", Str),
        Field::optional("loss", Number),
        Field::optional("params", Nested(&FUSED_PARAMS)),
    ],
    any_of: &[],
};

pub fn equipment_table(category: Category) -> &'static Table {
    match category {
        Category::Edfa => &EDFA,
        Category::Fiber => &FIBER,
        Category::RamanFiber => &RAMAN_FIBER,
        Category::Roadm => &ROADM,
        Category::Transceiver => &TRANSCEIVER,
        Category::MultibandAmplifier => &MULTIBAND_AMPLIFIER,
        Category::Fused => &FUSED,
    }
}

pub fn element_params_table(element_type: ElementType) -> &'static Table {
    match element_type {
        ElementType::Fiber | ElementType::RamanFiber => &FIBER_PARAMS,
        ElementType::Edfa => &EDFA_PARAMS,
        ElementType::Roadm => &ROADM_PARAMS,
        ElementType::Transceiver => &TRANSCEIVER_PARAMS,
        ElementType::MultibandAmplifier => &MULTIBAND_PARAMS,
        ElementType::Fused => &FUSED_PARAMS,
    }
}

/// `None` when the type carries no operational block.
pub fn element_operational_table(element_type: ElementType) -> Option<&'static Table> {
    match element_type {
        ElementType::Edfa | ElementType::MultibandAmplifier => Some(&EDFA_OPERATIONAL),
        ElementType::RamanFiber => Some(&RAMAN_OPERATIONAL),
        _ => None,
    }
}
