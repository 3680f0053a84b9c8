use serde_json::json;

use ncmcli::netease::parser::{
    normalize_page, parse_album_songs_reply, parse_artist_albums_page, parse_artists_page,
    parse_albums_page, parse_song, parse_songs_page, parse_stream_url,
};
use ncmcli::types::{Album, Artist};

fn parent_artist() -> Artist {
    Artist {
        artist_id: "9".to_string(),
        artist: "Album Artist".to_string(),
    }
}

fn parent_album() -> Album {
    Album {
        album_id: "77".to_string(),
        album: "Parent Album".to_string(),
        cover_url: "http://cover.example/77.jpg".to_string(),
    }
}

#[test]
fn track_numbers_are_reassigned_sequentially() {
    let root = json!({"code": 200, "result": {"songCount": 3, "songs": [
        {"id": 1, "name": "A", "dt": 1000, "no": 9},
        {"id": 2, "name": "B", "dt": 1000, "no": 4},
        {"id": 3, "name": "C", "dt": 1000, "no": 7}
    ]}});

    let page = parse_songs_page(&root, &Artist::default(), &Album::default()).unwrap();
    let tracks: Vec<u32> = page.songs.iter().map(|song| song.track).collect();
    assert_eq!(tracks, vec![1, 2, 3]);
}

#[test]
fn single_disc_pages_force_disc_to_zero() {
    let root = json!({"code": 200, "result": {"songs": [
        {"id": 1, "name": "A", "dt": 1000, "cd": "1"},
        {"id": 2, "name": "B", "dt": 1000, "cd": "1"}
    ]}});

    let page = parse_songs_page(&root, &Artist::default(), &Album::default()).unwrap();
    assert!(page.songs.iter().all(|song| song.disc == 0));
}

#[test]
fn multidisc_pages_keep_decoded_disc_numbers() {
    let root = json!({"code": 200, "result": {"songs": [
        {"id": 1, "name": "A", "dt": 1000, "cd": "1"},
        {"id": 2, "name": "B", "dt": 1000, "cd": "2"}
    ]}});

    let page = parse_songs_page(&root, &Artist::default(), &Album::default()).unwrap();
    let discs: Vec<u32> = page.songs.iter().map(|song| song.disc).collect();
    assert_eq!(discs, vec![1, 2]);
}

#[test]
fn compilation_flag_propagates_to_the_whole_page() {
    let root = json!({"code": 200,
        "album": {"id": 77, "name": "Parent Album", "picUrl": "http://cover.example/77.jpg"},
        "songs": [
            {"id": 1, "name": "A", "dt": 1000, "ar": [{"id": 1, "name": "Somebody Else"}]},
            {"id": 2, "name": "B", "dt": 1000, "ar": [{"id": 9, "name": "Album Artist"}]}
        ]});

    let page = parse_album_songs_reply(&root, &parent_artist(), &parent_album()).unwrap();
    assert!(page.songs.iter().all(|song| song.compilation));
}

#[test]
fn invalid_song_is_skipped_without_aborting_siblings() {
    let root = json!({"code": 200, "result": {"songs": [
        {"id": 1, "name": "A", "dt": 1000},
        {"id": 2, "name": "B"},
        {"id": 3, "name": "C", "dt": 1000}
    ]}});

    let page = parse_songs_page(&root, &Artist::default(), &Album::default()).unwrap();
    assert_eq!(page.reported, 3);
    assert_eq!(page.songs.len(), 2);
    assert_eq!(page.skipped.len(), 1);
}

#[test]
fn song_identity_falls_back_to_parents() {
    let object = json!({"id": 5, "name": "Orphan", "dt": 1000});

    let song = parse_song(&object, &parent_artist(), &parent_album()).unwrap();
    assert_eq!(song.artist_id, "9");
    assert_eq!(song.artist, "Album Artist");
    assert_eq!(song.album_id, "77");
    assert_eq!(song.album, "Parent Album");
    assert_eq!(song.cover_url.as_deref(), Some("http://cover.example/77.jpg"));
    assert_eq!(song.url, "netease://5");
}

#[test]
fn incomplete_album_identity_is_replaced_as_a_unit() {
    // An al object with a name but no picUrl falls back entirely.
    let object = json!({"id": 5, "name": "Half", "dt": 1000,
        "al": {"id": 123, "name": "Some Album"}});

    let song = parse_song(&object, &parent_artist(), &parent_album()).unwrap();
    assert_eq!(song.album_id, "77");
    assert_eq!(song.album, "Parent Album");
}

#[test]
fn normalize_is_a_batch_pass() {
    let mut songs = vec![
        parse_song(
            &json!({"id": 1, "name": "A", "dt": 1000, "cd": "2"}),
            &Artist::default(),
            &Album::default(),
        )
        .unwrap(),
        parse_song(
            &json!({"id": 2, "name": "B", "dt": 1000, "cd": "1"}),
            &Artist::default(),
            &Album::default(),
        )
        .unwrap(),
    ];

    normalize_page(&mut songs);
    assert_eq!(songs[0].track, 1);
    assert_eq!(songs[1].track, 2);
    // Disc 2 on the first song keeps both decoded disc numbers.
    assert_eq!(songs[0].disc, 2);
    assert_eq!(songs[1].disc, 1);
}

#[test]
fn artists_page_reads_total_and_skips_bad_entries() {
    let root = json!({"code": 200, "result": {"artistCount": 40, "artists": [
        {"id": 1, "name": "Good"},
        {"id": 2},
        "not an object"
    ]}});

    let page = parse_artists_page(&root).unwrap();
    assert_eq!(page.total, Some(40));
    assert_eq!(page.artists.len(), 1);
    assert_eq!(page.skipped.len(), 2);
}

#[test]
fn artists_page_requires_result_shape() {
    let err = parse_artists_page(&json!({"code": 200})).unwrap_err();
    assert!(err.to_string().contains("Missing result object"));

    let err = parse_artists_page(&json!({"code": 502})).unwrap_err();
    assert!(err.to_string().contains("502"));
}

#[test]
fn albums_page_prefers_embedded_artist() {
    let root = json!({"code": 200, "result": {"albumCount": 1, "albums": [
        {"id": 11, "name": "Album", "picUrl": "http://cover.example/11.jpg",
         "artist": {"id": 4, "name": "Embedded"}}
    ]}});

    let page = parse_albums_page(&root, &parent_artist()).unwrap();
    let (artist, album) = &page.albums[0];
    assert_eq!(artist.artist, "Embedded");
    assert_eq!(album.album_id, "11");
}

#[test]
fn artist_albums_page_reports_more_flag() {
    let root = json!({"code": 200, "more": true, "hotAlbums": [
        {"id": 11, "name": "Album", "picUrl": ""}
    ]});

    let page = parse_artist_albums_page(&root, &parent_artist()).unwrap();
    assert!(page.more);
    assert_eq!(page.albums.len(), 1);
    // No embedded artist: the parent identity is threaded through.
    assert_eq!(page.albums[0].0.artist, "Album Artist");
}

#[test]
fn stream_url_decodes_type_and_sample_rate() {
    let root = json!({"code": 200, "data": [
        {"id": 5, "url": "http://m.example/5.flac", "type": "FLAC", "sr": 44100}
    ]});

    let stream = parse_stream_url(&root).unwrap();
    assert_eq!(stream.url, "http://m.example/5.flac");
    assert_eq!(stream.filetype, "flac");
    assert_eq!(stream.sample_rate, 44100);
}

#[test]
fn stream_url_requires_a_url() {
    let err = parse_stream_url(&json!({"code": 200, "data": [{"id": 5}]})).unwrap_err();
    assert!(err.to_string().contains("Missing stream url"));

    let err = parse_stream_url(&json!({"code": 200, "data": []})).unwrap_err();
    assert!(err.to_string().contains("Missing stream data array"));
}

#[test]
fn stream_url_falls_back_to_extension() {
    let root = json!({"code": 200, "data": [
        {"id": 5, "url": "http://m.example/track.mp3?token=abc"}
    ]});

    let stream = parse_stream_url(&root).unwrap();
    assert_eq!(stream.filetype, "mp3");
    assert_eq!(stream.sample_rate, -1);
}
