use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the `weather` array OpenWeatherMap attaches to every sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

/// Precipitation volume over the last hour (OneCall) or three hours (forecast).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Precipitation {
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    pub three_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub dt: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub pressure: u32,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub dew_point: f64,
    #[serde(default)]
    pub uvi: f64,
    #[serde(default)]
    pub clouds: u8,
    #[serde(default)]
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_deg: u16,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub rain: Option<Precipitation>,
    #[serde(default)]
    pub snow: Option<Precipitation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyConditions {
    pub dt: i64,
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    #[serde(default)]
    pub day: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub night: f64,
    #[serde(default)]
    pub eve: f64,
    #[serde(default)]
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyConditions {
    pub dt: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
    pub temp: DailyTemperature,
    #[serde(default)]
    pub pressure: u32,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_deg: u16,
    #[serde(default)]
    pub uvi: f64,
    /// Probability of precipitation, 0.0..=1.0.
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub rain: Option<f64>,
    #[serde(default)]
    pub snow: Option<f64>,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub sender_name: String,
    pub event: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub description: String,
}

/// Response of the OneCall endpoint (current conditions plus hourly/daily outlook).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDocument {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub timezone_offset: i64,
    #[serde(default)]
    pub current: Option<CurrentConditions>,
    #[serde(default)]
    pub hourly: Vec<HourlyConditions>,
    #[serde(default)]
    pub daily: Vec<DailyConditions>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub pressure: u32,
    #[serde(default)]
    pub humidity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: u16,
    #[serde(default)]
    pub gust: Option<f64>,
}

/// One three-hour slot of the 5-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalEntry {
    pub dt: i64,
    pub main: IntervalMain,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub visibility: Option<u32>,
    #[serde(default)]
    pub rain: Option<Precipitation>,
    #[serde(default)]
    pub snow: Option<Precipitation>,
    #[serde(default)]
    pub dt_txt: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub timezone: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// Response of the 5-day / 3-hour forecast endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalForecastDocument {
    #[serde(default)]
    pub cnt: u32,
    pub list: Vec<IntervalEntry>,
    #[serde(default)]
    pub city: City,
}

impl CurrentConditions {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }

    pub fn description(&self) -> &str {
        first_description(&self.weather)
    }
}

impl DailyConditions {
    pub fn date(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }

    pub fn description(&self) -> &str {
        first_description(&self.weather)
    }
}

impl IntervalEntry {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }

    pub fn description(&self) -> &str {
        first_description(&self.weather)
    }
}

pub fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn first_description(weather: &[Condition]) -> &str {
    weather.first().map(|w| w.description.as_str()).unwrap_or("Unknown")
}
