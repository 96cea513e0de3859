//! Common test utilities: a Mediaflux service endpoint on wiremock and
//! worklist/archive fixtures

#![allow(dead_code)]

use a4download::{Config, DownloadConfig, Protocol, ServerConfig};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-secure-token";
pub const SESSION: &str = "sess-0001";
pub const STUDY: &str = "1.2.3.4.5.6";
pub const CT_SERIES: &str = "1.2.3.4.5.6.1";
pub const PET_SERIES: &str = "1.2.3.4.5.6.2";

/// Worklist text in the format written by the scanner workstation
pub fn worklist_text(study: &str, new_id: &str) -> String {
    format!(
        "Patient worklist\r\nDARIS_ID: {study}\r\nNEWID: {new_id}\r\n\
         CTFILETSEND: CT Chest\r\nPETFILETSEND: PET Chest\r\n"
    )
}

pub fn write_worklist(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Configuration pointing at the mock server over plain HTTP
pub fn config_for(server: &MockServer, output_dir: &Path, worklists: Vec<PathBuf>) -> Config {
    Config {
        server: ServerConfig {
            host: server.address().ip().to_string(),
            port: server.address().port(),
            protocol: Protocol::Http,
            token: Some(TOKEN.to_string()),
        },
        download: DownloadConfig {
            output_dir: output_dir.to_path_buf(),
            ..Default::default()
        },
        worklists,
    }
}

pub fn result_reply(inner: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <response><reply type=\"result\"><result>{inner}</result></reply></response>"
    )
}

pub fn error_reply(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <response><reply type=\"error\"><error>arc.mf.server.Services$ExServiceError</error>\
         <message>{message}</message></reply></response>"
    )
}

pub fn xml_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/xml")
}

/// In-memory zip holding the given files
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Entry names of a zip file, in archive order
pub fn zip_entry_names(archive: &Path) -> Vec<String> {
    let file = std::fs::File::open(archive).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Content of one zip entry
pub fn zip_entry(archive: &Path, name: &str) -> Vec<u8> {
    let file = std::fs::File::open(archive).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

fn service(name: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/__mflux_svc__"))
        .and(body_string_contains(format!("<service name=\"{name}\"")))
}

/// Logon answering with [`SESSION`]; logoff expected exactly once
pub async fn mount_session(server: &MockServer) {
    service("system.logon")
        .and(body_string_contains(format!("<token>{TOKEN}</token>")))
        .respond_with(xml_response(result_reply(&format!(
            "<session>{SESSION}</session>"
        ))))
        .expect(1)
        .mount(server)
        .await;

    service("system.logoff")
        .and(body_string_contains(format!("session=\"{SESSION}\"")))
        .respond_with(xml_response(result_reply("")))
        .expect(1)
        .mount(server)
        .await;
}

/// `asset.query` for `description` answering with `cids`
pub async fn mount_query(server: &MockServer, description: &str, cids: &[&str]) {
    let leaves: String = cids.iter().map(|c| format!("<cid>{c}</cid>")).collect();
    service("asset.query")
        .and(body_string_contains(format!("session=\"{SESSION}\"")))
        .and(body_string_contains(format!(
            "xpath(mf-dicom-series/description)=&apos;{description}&apos;"
        )))
        .respond_with(xml_response(result_reply(&leaves)))
        .mount(server)
        .await;
}

/// `daris.dicom.download` of `series` answering with a zip stream
pub async fn mount_download(server: &MockServer, series: &str, files: &[(&str, &[u8])]) {
    service("daris.dicom.download")
        .and(body_string_contains(format!("<cid>{series}</cid>")))
        .and(body_string_contains("<atype>zip</atype>"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(zip_bytes(files), "application/zip"))
        .expect(1)
        .mount(server)
        .await;
}

/// The standard study: one CT and one PET series
pub async fn mount_study(server: &MockServer) {
    mount_query(server, "CT Chest", &[CT_SERIES]).await;
    mount_query(server, "PET Chest", &[PET_SERIES]).await;
    mount_download(
        server,
        CT_SERIES,
        &[("IM-0001.dcm", b"ct-slice-1"), ("IM-0002.dcm", b"ct-slice-2")],
    )
    .await;
    mount_download(server, PET_SERIES, &[("IM-0001.dcm", b"pet-slice-1")]).await;
}
