fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use cloudpan_client::ClientError;
    use cloudpan_client::gateway::check_envelope;
    use cloudpan_protocol::Envelope;
    use cloudpan_protocol::messages::{
        CreatedFile, FileManagerResponse, FileMetasResponse, ListPage, LocateUploadResponse,
        PrecreateResponse, Quota, TokenGrant, UploadPartResponse, UserInfo,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a captured response, ignoring fields the client does not model.
    fn parse<T: serde::de::DeserializeOwned>(name: &str) -> T {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Deserializes a fixture, re-serializes it, and compares the JSON values.
    /// Only for payloads whose every field is modelled.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  ours: {reserialized}"
        );
    }

    // --- Upload ---

    #[test]
    fn fixture_precreate_response() {
        let resp: PrecreateResponse = parse("precreate_response.json");
        assert!(resp.uploadid.starts_with("N1-"));
        assert_eq!(resp.return_type, 1);
        assert_eq!(resp.block_list, vec![0, 1, 2]);
        assert_eq!(resp.path.as_deref(), Some("/apps/cloudpan/report.pdf"));
        assert!(Envelope::from_value(&load_fixture("precreate_response.json")).check().is_ok());
    }

    #[test]
    fn fixture_precreate_error() {
        let status = Envelope::from_value(&load_fixture("precreate_error.json"))
            .check()
            .unwrap_err();
        assert_eq!(status.code, -7);
        assert_eq!(status.message, "file name is invalid");
    }

    #[test]
    fn fixture_locate_upload_response() {
        let resp: LocateUploadResponse = parse("locate_upload_response.json");
        assert_eq!(resp.first_server(), Some("https://d.pcs.baidu.com"));
        assert_eq!(resp.servers.len(), 2);
        assert_eq!(resp.bak_servers.len(), 1);
        assert_eq!(resp.host.as_deref(), Some("c.pcs.baidu.com"));
    }

    #[test]
    fn fixture_upload_part_response() {
        let resp: UploadPartResponse = parse("upload_part_response.json");
        assert_eq!(resp.md5.as_deref(), Some("b1946ac92492d2347c6235b4d2611184"));
        assert!(resp.uploadid.is_some());
    }

    #[test]
    fn fixture_create_response() {
        let created: CreatedFile = parse("create_response.json");
        assert_eq!(created.fs_id, 693_789_892_866_840);
        assert_eq!(created.path, "/apps/cloudpan/report.pdf");
        assert_eq!(created.size, 10 * 1024 * 1024);
        assert_eq!(created.server_filename, "report.pdf");
        assert_eq!(created.isdir, 0);
    }

    // --- Listing and file management ---

    #[test]
    fn fixture_listall_response() {
        let page: ListPage = parse("listall_response.json");
        assert!(page.has_more());
        assert_eq!(page.cursor, 1000);
        assert_eq!(page.list.len(), 2);
        assert!(page.list[0].is_dir());
        assert!(!page.list[1].is_dir());
        assert_eq!(page.list[1].md5, "7d57c40c9fdb4e4a32d533bee1a4e409");
    }

    #[test]
    fn fixture_filemetas_response() {
        let resp: FileMetasResponse = parse("filemetas_response.json");
        let meta = &resp.list[0];
        assert_eq!(meta.fs_id, 591_823_752_378_234);
        assert_eq!(meta.filename, "report.pdf");
        assert!(meta.dlink.as_deref().unwrap().starts_with("https://d.pcs.baidu.com/file/"));
    }

    #[test]
    fn fixture_filemanager_response() {
        let resp: FileManagerResponse = parse("filemanager_response.json");
        assert_eq!(resp.taskid, Some(381_746_237_812));
        let failed: Vec<&str> = resp
            .info
            .iter()
            .filter(|i| i.errno != 0)
            .map(|i| i.path.as_str())
            .collect();
        assert_eq!(failed, vec!["/apps/cloudpan/missing.txt"]);
    }

    // --- Account and auth ---

    #[test]
    fn fixture_uinfo_response() {
        roundtrip_test::<UserInfo>("uinfo_response.json");
        let user: UserInfo = parse("uinfo_response.json");
        assert_eq!(user.vip_type, 2);
    }

    #[test]
    fn fixture_quota_response() {
        roundtrip_test::<Quota>("quota_response.json");
    }

    #[test]
    fn fixture_token_response() {
        let grant: TokenGrant = parse("token_response.json");
        assert_eq!(grant.expires_in, 2_592_000);
        assert!(grant.access_token.starts_with("121."));
        assert_eq!(grant.scope.as_deref(), Some("basic netdisk"));
    }

    #[test]
    fn fixture_auth_error() {
        let err = check_envelope(&load_fixture("auth_error.json")).unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }
}
