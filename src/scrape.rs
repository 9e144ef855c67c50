//! Extraction of fields the portal only exposes inside HTML/script text.

use tracing::{debug, warn};

use crate::types::OutdoorWeather;
use crate::{Error, Result};

const OUTDOOR_TEMP_MARKER: &str = "Control.Model.Property.outdoorTemp,";
const OUTDOOR_HUMIDITY_MARKER: &str = "Control.Model.Property.outdoorHumidity,";

/// Find the location id in the post-login response: first the path segment
/// after `portal/` in the final URL, then a `locationId=NNN` scan of the body.
pub(crate) fn location_id(url: &str, body: &str) -> Result<i64> {
    if let Some(rest) = url.split("portal/").nth(1) {
        let segment = rest.split('/').next().unwrap_or("");
        if let Ok(id) = segment.parse::<i64>() {
            return Ok(id);
        }
    }

    debug!("unable to grab location id via url, checking content instead");
    location_id_in_body(body).ok_or_else(|| Error::LocationIdNotFound(url.to_string()))
}

fn location_id_in_body(body: &str) -> Option<i64> {
    let rest = body.split("locationId=").nth(1)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Pull the display name out of a device control page. The name sits between
/// the `"ZoneName"` element and a trailing ` Control` suffix.
pub(crate) fn zone_name(page: &str) -> Option<String> {
    let after_id = &page[page.find("\"ZoneName\"")?..];
    let start = after_id.find('>')? + 1;
    let len = after_id[start..].find(" Control<")?;
    Some(after_id[start..start + len].to_string())
}

/// Scrape the outdoor readings embedded in a control page's script text.
/// Both fields are independently optional: a missing marker or an unparsable
/// literal is logged and yields `None`, never an error.
pub(crate) fn outdoor_weather(page: &str, device_id: i64) -> OutdoorWeather {
    let temperature = numeric_property(page, OUTDOOR_TEMP_MARKER);
    if temperature.is_none() {
        warn!(device_id, "unable to find the outdoor temperature");
    }

    let humidity = numeric_property(page, OUTDOOR_HUMIDITY_MARKER);
    if humidity.is_none() {
        warn!(device_id, "unable to find the outdoor humidity");
    }

    OutdoorWeather { temperature, humidity }
}

/// The markers introduce numeric literals of the form `marker 61.0)`; parse
/// as float, truncate to integer.
fn numeric_property(page: &str, marker: &str) -> Option<i64> {
    let literal = page.split(marker).nth(1)?.split(')').next()?.trim();
    literal.parse::<f64>().ok().map(|v| v as i64)
}
