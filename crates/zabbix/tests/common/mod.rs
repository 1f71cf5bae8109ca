//! Client constructors over the shared fake Zabbix server.

#![allow(dead_code)]

use std::time::Duration;

use zreport_zabbix::ZabbixClient;

pub use zreport_test_support::{raw_event, FakeZabbix, API_TOKEN, EVENTS_DOWN_BODY};

pub trait FakeZabbixExt {
    /// An unauthenticated client pointed at the fake.
    fn client(&self) -> ZabbixClient;
    /// A client carrying the fake's accepted API token.
    fn token_client(&self) -> ZabbixClient;
}

impl FakeZabbixExt for FakeZabbix {
    fn client(&self) -> ZabbixClient {
        ZabbixClient::new(&self.url, Duration::from_secs(5)).unwrap()
    }

    fn token_client(&self) -> ZabbixClient {
        self.client().with_api_token(API_TOKEN)
    }
}
