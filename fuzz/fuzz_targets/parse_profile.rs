#![no_main]

use libfuzzer_sys::fuzz_target;
use webid_lib::{extract_claims, profile_info, FetchedDocument, MediaType, ProfileStore, StaticProfileStore};

const URI: &str = "https://alice.example/card#me";

fuzz_target!(|data: &[u8]| {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let media_type = if selector & 1 == 0 {
        MediaType::RdfXml
    } else {
        MediaType::XhtmlRdfa
    };
    let document = FetchedDocument {
        uri: "https://alice.example/card".to_string(),
        status: 200,
        content_type: media_type.mime().to_string(),
        media_type,
        body: body.to_vec(),
    };

    // Neither parser may panic; claims from any graph must be extractable.
    if let Ok(graph) = StaticProfileStore::new().parse(&document) {
        let _ = graph.to_ntriples();
        for claim in extract_claims(&graph, URI) {
            let _ = claim.key.public_key();
            let _ = claim.key.to_string();
        }
        let _ = profile_info(&graph, URI).is_empty();
    }
});
