//! CLI command definitions

use clap::Args;

/// Run a recipe
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to recipe YAML file
    #[arg(short, long)]
    pub file: String,

    /// Let simulated kettles heat and chillers cool their sensors
    #[arg(long)]
    pub simulate: bool,

    /// Initial sensor readings (id=value)
    #[arg(long, value_parser = parse_sensor_value)]
    pub sensor: Vec<(String, f64)>,

    /// Ambient temperature of the simulated brewery
    #[arg(long, default_value_t = 20.0)]
    pub ambient: f64,
}

/// Validate a recipe file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to recipe YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Parse sensor=reading pairs
pub fn parse_sensor_value(s: &str) -> Result<(String, f64), String> {
    let (sensor, value) = parse_key_value(s)?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid reading for sensor {}: {}", sensor, value))?;
    Ok((sensor, value))
}
