mod helpers;

#[test]
#[ignore]
fn sladd_slcard_slall() {
    let vk = helpers::ValkeyInstance::start();
    let client = redis::Client::open(vk.url()).expect("client");
    let mut con = client.get_connection().expect("conn");

    let added: i64 = redis::cmd("SLADD")
        .arg("k")
        .arg("score1")
        .arg("v1")
        .arg("score2")
        .arg("v2")
        .query(&mut con)
        .expect("sladd");
    assert_eq!(added, 2);

    let card: i64 = redis::cmd("SLCARD").arg("k").query(&mut con).expect("slcard");
    assert_eq!(card, 2);

    let all: Vec<String> = redis::cmd("SLALL").arg("k").query(&mut con).expect("slall");
    assert_eq!(all, vec!["score1", "v1", "score2", "v2"]);

    // Re-adding the same pairs is not net-new.
    let again: i64 = redis::cmd("SLADD")
        .arg("k")
        .arg("score1")
        .arg("v1")
        .arg("score2")
        .arg("v2")
        .query(&mut con)
        .expect("sladd again");
    assert_eq!(again, 0);
    drop(vk);
}

#[test]
#[ignore]
fn slrange_slsearch_slrem() {
    let vk = helpers::ValkeyInstance::start();
    let client = redis::Client::open(vk.url()).expect("client");
    let mut con = client.get_connection().expect("conn");

    for i in 1..=4 {
        let _: i64 = redis::cmd("SLADD")
            .arg("k")
            .arg(format!("score{i}"))
            .arg(format!("v{i}"))
            .query(&mut con)
            .unwrap();
    }

    let mid: Vec<String> = redis::cmd("SLRANGE")
        .arg("k")
        .arg("[score2")
        .arg("(score4")
        .query(&mut con)
        .unwrap();
    assert_eq!(mid, vec!["score2", "v2", "score3", "v3"]);

    let hit: Vec<String> = redis::cmd("SLSEARCH")
        .arg("k")
        .arg("score3")
        .query(&mut con)
        .unwrap();
    assert_eq!(hit, vec!["score3", "v3"]);

    let bad: redis::RedisResult<Vec<String>> = redis::cmd("SLRANGE")
        .arg("k")
        .arg("-oops")
        .arg("+")
        .query(&mut con);
    assert!(bad.is_err());

    let removed: i64 = redis::cmd("SLREM")
        .arg("k")
        .arg("score1")
        .arg("score2")
        .arg("score3")
        .query(&mut con)
        .unwrap();
    assert_eq!(removed, 3);

    let removed: i64 = redis::cmd("SLREM")
        .arg("k")
        .arg("score4")
        .query(&mut con)
        .unwrap();
    assert_eq!(removed, 1);

    // Draining the list drops the key itself.
    let exists: i64 = redis::cmd("EXISTS").arg("k").query(&mut con).unwrap();
    assert_eq!(exists, 0);
    drop(vk);
}
