//! Weather Tool
//!
//! Current conditions from the OpenWeatherMap API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use vea_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::{ParamType, ParameterSchema},
};

use super::choice_arg;
use crate::error::{Result, ToolFailure};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

/// Tool for fetching current weather
pub struct WeatherTool {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherTool {
    pub const NAME: &'static str = "fetch_weather_data";

    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: OPENWEATHER_BASE_URL.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `q` parameter: a comma-separated city is passed through untouched
    pub fn location_query(city: &str, state: Option<&str>, country: Option<&str>) -> String {
        if city.contains(',') {
            return city.to_string();
        }
        match (state, country) {
            (Some(state), Some(country)) => format!("{city},{state},{country}"),
            (None, Some(country)) => format!("{city},{country}"),
            _ => city.to_string(),
        }
    }

    async fn fetch(&self, query: &str, units: Units) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ToolFailure::MissingApiKey("OPENWEATHER_API_KEY"))?;

        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("appid", api_key), ("units", units.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Fetch weather data for a city with optional country/state specification. \
                This provides the current weather conditions using the OpenWeatherMap API. \
                Examples: city='Cambridge', country='US', state='MA' for Cambridge, Massachusetts; \
                city='Cambridge', country='GB' for Cambridge, UK."
                .into(),
            parameters: vec![
                ParameterSchema::required("city", ParamType::String, "City name, or 'City,State,Country'"),
                ParameterSchema::optional("country", ParamType::String, "ISO 3166 country code (e.g., 'US', 'GB', 'CN')"),
                ParameterSchema::optional("state", ParamType::String, "State code for US cities (e.g., 'MA', 'CA')"),
                ParameterSchema::optional(
                    "units",
                    ParamType::String,
                    "Temperature units, 'metric' for Celsius or 'imperial' for Fahrenheit; use metric unless asked otherwise",
                )
                .with_enum(["metric", "imperial"])
                .with_default(json!("metric")),
            ],
            category: Some("weather".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let city = call.str_arg("city").unwrap_or_default();
        let units = choice_arg(call, "units", Some(Units::default()))?;
        let query = Self::location_query(city, call.str_arg("state"), call.str_arg("country"));

        tracing::debug!(query = %query, units = units.as_str(), "Fetching weather");

        Ok(match self.fetch(&query, units).await {
            Ok(data) => ToolResult::json(Self::NAME, data),
            Err(failure) => {
                tracing::warn!(query = %query, error = %failure, "Weather lookup failed");
                let data = json!({ "error": failure.to_string() });
                ToolResult::failure(Self::NAME, data.to_string()).with_data(data)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vea_core::tool::ToolArguments;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn call(pairs: Value) -> ToolCall {
        let args: ToolArguments = pairs.as_object().cloned().unwrap_or_default();
        ToolCall::new(WeatherTool::NAME, args)
    }

    #[test]
    fn test_location_query() {
        assert_eq!(WeatherTool::location_query("Cambridge,MA,US", Some("XX"), None), "Cambridge,MA,US");
        assert_eq!(WeatherTool::location_query("Cambridge", Some("MA"), Some("US")), "Cambridge,MA,US");
        assert_eq!(WeatherTool::location_query("Cambridge", None, Some("GB")), "Cambridge,GB");
        assert_eq!(WeatherTool::location_query("Cambridge", Some("MA"), None), "Cambridge");
        assert_eq!(WeatherTool::location_query("Paris", None, None), "Paris");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let tool = WeatherTool::new(Client::new(), None);
        let result = tool.execute(&call(json!({"city": "Paris"}))).await.unwrap();

        assert!(!result.success);
        assert_eq!(
            result.data,
            Some(json!({"error": "OPENWEATHER_API_KEY environment variable not set"}))
        );
    }

    #[tokio::test]
    async fn test_fetches_current_weather() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Cambridge,MA,US"))
            .and(query_param("appid", "secret"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Cambridge",
                "main": {"temp": 71.6, "humidity": 40},
                "weather": [{"description": "clear sky"}]
            })))
            .mount(&server)
            .await;

        let tool = WeatherTool::new(Client::new(), Some("secret".into())).with_base_url(server.uri());
        let result = tool
            .execute(&call(json!({"city": "Cambridge", "state": "MA", "country": "US", "units": "imperial"})))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data.unwrap()["main"]["temp"], 71.6);
    }

    #[tokio::test]
    async fn test_http_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"cod": "404", "message": "city not found"})))
            .mount(&server)
            .await;

        let tool = WeatherTool::new(Client::new(), Some("secret".into())).with_base_url(server.uri());
        let result = tool.execute(&call(json!({"city": "Atlantis"}))).await.unwrap();

        assert!(!result.success);
        let error = result.data.unwrap()["error"].as_str().unwrap_or_default().to_string();
        assert!(error.starts_with("Request failed: "));
    }
}
