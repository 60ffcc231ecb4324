pub mod caldav_client;
