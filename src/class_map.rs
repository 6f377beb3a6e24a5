//! Collapses individual GT4 car models into a single `gt4` performance
//! class, so lap records are compared within the class rather than
//! fragmented per chassis.
//!
//! Every other car model is its own class: `class_of` falls back to the
//! model string itself when no mapping applies.

/// GT4 car models recognised as belonging to the shared `gt4` class.
const GT4_MODELS: &[&str] = &[
    "gt4_alpine_a110",
    "gt4_aston_martin_vantage",
    "gt4_audi_r8",
    "gt4_bmw_m4",
    "gt4_camaro",
    "gt4_ford_mustang",
    "gt4_ginetta_g55",
    "gt4_ktm_xbow",
    "gt4_mclaren_570s",
    "gt4_mercedes_amg",
    "gt4_panoz_avezzano",
    "gt4_porsche_cayman_718",
    "gt4_saleen_s1",
    "gt4_sin_r1",
    "gt4_toyota_supra",
    "lotus_2_eleven_gt4",
    "ks_maserati_gt_mc_gt4",
    "ks_porsche_cayman_gt4_clubsport",
];

/// The performance class a lap should be recorded/compared under for
/// the given car model.
///
/// GT4 models all collapse to `"gt4"`. Anything else is its own class,
/// identified by the model string itself.
pub fn class_of(car_model: &str) -> &str {
    if GT4_MODELS.contains(&car_model) {
        "gt4"
    } else {
        car_model
    }
}
