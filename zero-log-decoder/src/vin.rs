//! Zero Motorcycles VIN decoding
//!
//! Turns the VIN found in an MBB log header into model year, platform,
//! model, motor, and pack capacity using the manufacturer's code tables.

use serde::Serialize;

const YEARS_BY_CODE: &[(&str, u16)] = &[
    ("9", 2009),
    ("A", 2010),
    ("B", 2011),
    ("C", 2012),
    ("D", 2013),
    ("E", 2014),
    ("F", 2015),
    ("G", 2016),
    ("H", 2017),
    ("J", 2018),
    ("K", 2019),
    ("L", 2020),
    ("M", 2021),
    ("N", 2022),
    ("P", 2023),
    ("R", 2024),
    ("S", 2025),
];

/// Motor code -> "<power> [<size>]"
const MOTORS_BY_CODE: &[(&str, &str)] = &[
    ("M3", "9.1kW"),
    ("ZA", "11kW 75-5"),
    ("ZB", "11kW 75-7"),
    ("Z1", "13kW"),
    ("Z2", "16kW 75-7"),
    ("Z3", "16kW 75-7R"),
    ("Z4", "17kW 75-5"),
    ("Z5", "21kW 75-7"),
    ("Z6", "21kW 75-7R"),
    ("Z7", "40kW 75-10R"),
];

/// Model line code -> "<models> [<pack capacity> [<power>]]"
const MODEL_LINES_BY_CODE: &[(&str, &str)] = &[
    ("M2", "S"),
    ("M3", "S"),
    ("M4", "S/SR/SP 8.5"),
    ("M5", "S/SR/SP 11.4"),
    ("M7", "S/SR/SP 9.4"),
    ("M8", "S/SR/SP 12.5"),
    ("M9", "S/SR/SP 13.0"),
    ("M0", "S/SR/SP 9.8"),
    ("MB", "S/SP 6.5"),
    ("MC", "S/SR/SP/SRP 13.0"),
    ("MD", "S 13.0 (11kW)"),
    ("ME", "S 7.2 (11kW)"),
    ("MF", "S/SR 14.4"),
    ("MG", "S 14.4 (11kW)"),
    ("MH", "S 7.2 (11kW)"),
    ("MK", "S 14.4 (11kW)"),
    ("D2", "DS"),
    ("D3", "DS"),
    ("D4", "DS"),
    ("D5", "DS/DSR/DSP 11.4"),
    ("D6", "DS/DSR/DSP 8.5"),
    ("D7", "DS/DSR/DSP 9.4"),
    ("D8", "DS/DSR/DSP 12.5"),
    ("D9", "DS/DSR/DSP 13.0"),
    ("D0", "DS/DSR/DSP 9.8"),
    ("DA", "DS 6.5"),
    ("DB", "DS/DSR/DSP/DSRP 13.0"),
    ("DC", "DS 7.2 (11kW)"),
    ("DD", "DS/DSR 14.4"),
    ("DE", "DS 14.4 (11kW)"),
    ("DF", "DS 7.2 (11kW)"),
    ("DH", "DS 14.4 (11kW)"),
    ("X2", "MX"),
    ("X3", "FX"),
    ("X4", "FX/FXL"),
    ("X5", "FXP/FXLP"),
    ("X6", "FX/FXS"),
    ("X7", "FXP"),
    ("X8", "FX/FXS"),
    ("X9", "FXP"),
    ("XB", "FX/FXS/FXP"),
    ("XC", "FX/FXS/FXP"),
    ("C2", "XU-LSM (CA)"),
    ("L2", "XU-M (EU)"),
    ("U1", "XU"),
    ("U2", "XU"),
    ("U3", "XU"),
    ("FA", "SRF"),
];

const MODELS_BY_CODE: &[(&str, &str)] = &[
    ("A", "S"),
    ("B", "DS"),
    ("C", "FX"),
    ("E", "XU"),
    ("G", "SR/DSR"),
    ("H", "FXP"),
    ("J", "FXS"),
    ("K", "SRF"),
];

/// Vehicle attributes decoded from a VIN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleInfo {
    pub manufacturer: Option<String>,
    pub plant_location: Option<String>,
    pub year: u16,
    pub platform: Option<String>,
    pub model: String,
    pub motor: MotorInfo,
    pub pack_capacity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotorInfo {
    pub power: Option<String>,
    pub size: Option<String>,
}

fn lookup<T: Copy>(table: &[(&str, T)], code: &str) -> Option<T> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, value)| *value)
}

/// Decode a Zero Motorcycles VIN
///
/// Returns `None` if the VIN is too short or uses a code missing from the
/// tables.
pub fn decode_vin(vin: &str) -> Option<VehicleInfo> {
    let vin = vin.trim();
    if vin.len() < 12 {
        return None;
    }

    let year = lookup(YEARS_BY_CODE, vin.get(9..10)?)?;

    let platform_code = vin.get(3..4)?;
    let platform = match platform_code {
        "X" if year > 2012 => Some("XMX".to_string()),
        "S" if year > 2012 => Some("SDS".to_string()),
        "X" | "S" => Some(platform_code.to_string()),
        "Z" => Some("FST".to_string()),
        _ => None,
    };

    let model_line = lookup(MODEL_LINES_BY_CODE, vin.get(4..6)?)?;
    let mut line_parts = model_line.split(' ');
    let model_from_line = line_parts.next().unwrap_or_default();
    let pack_capacity = line_parts.next().map(str::to_string);
    let line_power = line_parts.next().map(str::to_string);

    let motor = lookup(MOTORS_BY_CODE, vin.get(6..8)?)?;
    let mut motor_parts = motor.splitn(2, ' ');
    let motor_power = motor_parts
        .next()
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .or(line_power);
    let motor_size = motor_parts.next().map(str::to_string);

    let mut model = lookup(MODELS_BY_CODE, vin.get(11..12)?)?.to_string();
    if model.contains('/') {
        if model == "SR/DSR" {
            model = if year > 2013 && year < 2016 {
                "SR".to_string()
            } else if model_from_line.contains("DS") {
                "DSR".to_string()
            } else {
                "SR".to_string()
            };
        }
        if let Some(size) = motor_size.as_deref() {
            let is_r_motor = size == "75-7R";
            if model.contains("DS/DSR") {
                model = if is_r_motor { "DSR" } else { "DS" }.to_string();
            } else if model.contains("S/SR") {
                model = if is_r_motor { "SR" } else { "S" }.to_string();
            }
        }
    }

    Some(VehicleInfo {
        manufacturer: vin
            .starts_with("538")
            .then(|| "Zero Motorcycles".to_string()),
        plant_location: (vin.get(10..11) == Some("C")).then(|| "Santa Cruz, CA".to_string()),
        year,
        platform,
        model,
        motor: MotorInfo {
            power: motor_power,
            size: motor_size,
        },
        pack_capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_dsr_vin() {
        let info = decode_vin("538SD9Z37GCG06073").unwrap();
        assert_eq!(info.manufacturer.as_deref(), Some("Zero Motorcycles"));
        assert_eq!(info.plant_location.as_deref(), Some("Santa Cruz, CA"));
        assert_eq!(info.year, 2016);
        assert_eq!(info.platform.as_deref(), Some("SDS"));
        assert_eq!(info.model, "DSR");
        assert_eq!(info.motor.power.as_deref(), Some("16kW"));
        assert_eq!(info.motor.size.as_deref(), Some("75-7R"));
        assert_eq!(info.pack_capacity.as_deref(), Some("13.0"));
    }

    #[test]
    fn test_sr_in_transition_years() {
        // 2015 SR/DSR code resolves to SR regardless of the model line
        let info = decode_vin("538SD9Z37FCG06073").unwrap();
        assert_eq!(info.year, 2015);
        assert_eq!(info.model, "SR");
    }

    #[test]
    fn test_motor_without_size() {
        let info = decode_vin("538XX2M39CCC00001").unwrap();
        assert_eq!(info.year, 2012);
        assert_eq!(info.platform.as_deref(), Some("X"));
        assert_eq!(info.model, "FX");
        assert_eq!(info.motor.power.as_deref(), Some("9.1kW"));
        assert_eq!(info.motor.size, None);
        assert_eq!(info.pack_capacity, None);
    }

    #[test]
    fn test_unknown_codes_are_not_decoded() {
        assert_eq!(decode_vin("538SD9Z37"), None);
        assert_eq!(decode_vin("538SQQZ37GCG06073"), None);
        assert_eq!(decode_vin(""), None);
    }
}
