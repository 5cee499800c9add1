//! Attribution cookies set on redirect responses.
//!
//! Three cookies carry the click back to the merchant page: click id,
//! tracking-link id, and (organic variant) click timestamp. They must stay
//! readable from page scripts so order-completion tagging works, hence
//! `HttpOnly=false`.

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};

use crate::config::get_config;

pub const CLICK_ID_COOKIE: &str = "sp_click_id";
pub const TRACKING_LINK_COOKIE: &str = "sp_tracking_link_id";
pub const CLICK_TIME_COOKIE: &str = "sp_click_time";

/// Cookies read back from an ad platform's client pixel.
pub const FBP_COOKIE: &str = "_fbp";
pub const FBC_COOKIE: &str = "_fbc";

fn attribution_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let config = get_config();
    Cookie::build(name, value)
        .path("/")
        .max_age(CookieDuration::seconds(config.tracking.cookie_max_age_secs))
        .http_only(false)
        .same_site(SameSite::Lax)
        .secure(config.tracking.secure_cookies)
        .finish()
}

/// Build the attribution cookie set for a redirect response. `click_time` is
/// only carried on the organic-channel variant.
pub fn build_attribution_cookies(
    click_id: &str,
    tracking_link_id: &str,
    click_time: Option<DateTime<Utc>>,
) -> Vec<Cookie<'static>> {
    let mut cookies = vec![
        attribution_cookie(CLICK_ID_COOKIE, click_id.to_string()),
        attribution_cookie(TRACKING_LINK_COOKIE, tracking_link_id.to_string()),
    ];
    if let Some(time) = click_time {
        cookies.push(attribution_cookie(
            CLICK_TIME_COOKIE,
            time.timestamp_millis().to_string(),
        ));
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::init_config;

    #[test]
    fn test_cookie_attributes() {
        init_config();

        let cookies = build_attribution_cookies("sp_1_abcd0123", "link1", None);
        assert_eq!(cookies.len(), 2);

        let click_cookie = &cookies[0];
        assert_eq!(click_cookie.name(), CLICK_ID_COOKIE);
        assert_eq!(click_cookie.value(), "sp_1_abcd0123");
        assert_eq!(click_cookie.path(), Some("/"));
        assert_eq!(
            click_cookie.max_age(),
            Some(CookieDuration::seconds(2_592_000))
        );
        assert_eq!(click_cookie.http_only(), Some(false));
        assert_eq!(click_cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_click_time_cookie_on_organic_variant() {
        init_config();

        let now = Utc::now();
        let cookies = build_attribution_cookies("sp_1_abcd0123", "link1", Some(now));
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[2].name(), CLICK_TIME_COOKIE);
        assert_eq!(cookies[2].value(), now.timestamp_millis().to_string());
    }
}
