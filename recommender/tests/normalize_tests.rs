use recommender::normalize::{has_operative_marker, is_closed_session, NormalizePolicy, Normalizer};

#[test]
fn keeps_only_the_operative_part() {
    let n = Normalizer::default();
    let raw = "Арбитражный суд города Москвы, рассмотрев дело,\nустановил:\nвзыскать долг с ответчика\nсуд решил:\nвзыскать и выдать исполнительный лист";
    let out = n.normalize(raw);
    assert!(out.contains("взыскать долг"));
    assert!(!out.contains("установил"));
    assert!(!out.contains("решил"));
    assert!(!out.contains("рассмотрев"));
}

#[test]
fn missing_start_marker_keeps_whole_text() {
    let n = Normalizer::default();
    let out = n.normalize("просто текст без каких-либо маркеров");
    assert!(out.contains("просто текст"));
}

#[test]
fn missing_end_marker_keeps_text_to_the_end() {
    let n = Normalizer::default();
    let out = n.normalize("шапка\nустановил:\nвзыскать долг до самого конца");
    assert!(out.contains("до самого конца"));
}

#[test]
fn operative_markers_are_detected() {
    assert!(has_operative_marker("суд\nустановил:\nтекст"));
    assert!(has_operative_marker("суд УСТАНОВИЛ :\nтекст"));
    assert!(!has_operative_marker("суд постановил иное"));
    assert!(is_closed_session("дело рассмотрено в закрытом судебном заседании"));
}

#[test]
fn spaced_capitals_are_collapsed() {
    let n = Normalizer::default();
    let out = n.normalize("дело рассмотрел судья И В А Н О В по иску");
    assert!(out.contains("ИВАНОВ"));
    assert!(!out.contains("И В А Н О В"));
}

#[test]
fn spaced_capitals_do_not_eat_following_lowercase() {
    let n = Normalizer::default();
    let out = n.normalize("переулок И В Ановский дом");
    assert!(out.contains("Ановский"));
}

#[test]
fn codex_names_become_abbreviations() {
    let n = Normalizer::default();
    assert!(n.normalize("на основании Налогового кодекса").contains("НК"));
    assert!(n
        .normalize("статьей 110 Арбитражного процессуального кодекса")
        .contains("АПК"));
    assert!(n
        .normalize("Кодекса об административных правонарушениях")
        .contains("КоАП"));
}

#[test]
fn amounts_become_sum() {
    let n = Normalizer::default();
    let out = n.normalize("взыскать 1 000 000 руб. 50 коп. долга");
    assert!(out.contains("SUM"));
    assert!(!out.contains("1 000 000"));
    let out = n.normalize("уплатить 50000 рублей");
    assert!(out.contains("SUM"));
}

#[test]
fn long_numbers_become_num_short_ones_survive() {
    let n = Normalizer::default();
    let out = n.normalize("дело А40-12345678 по статье 125 пункту 1234");
    assert!(out.contains("NUM"));
    assert!(out.contains("125"));
    assert!(out.contains("1234"));
    assert!(!out.contains("12345678"));
}

#[test]
fn num_threshold_is_a_policy_knob() {
    let n = Normalizer::new(NormalizePolicy { num_digit_threshold: 4, collapse_orgs: false });
    let out = n.normalize("пункт 1234 статья 125");
    assert!(out.contains("NUM"));
    assert!(out.contains("125"));
}

#[test]
fn masking_is_idempotent() {
    let n = Normalizer::default();
    let raw = "шапка\nустановил:\nвзыскать 1000000 руб. по делу 9876543";
    let once = n.normalize(raw);
    let twice = n.normalize(&once);
    assert_eq!(once, twice);
    assert!(once.contains("SUM"));
    assert!(once.contains("NUM"));
}

#[test]
fn mid_sentence_newlines_are_collapsed() {
    let n = Normalizer::default();
    let out = n.normalize("взыскать долг,\nа также проценты");
    assert!(out.contains("долг, а также"));
}

#[test]
fn org_collapsing_is_off_by_default() {
    let n = Normalizer::default();
    let out = n.normalize("Общество с ограниченной ответственностью «Ромашка»");
    assert!(out.contains("ограниченной"));

    let n = Normalizer::new(NormalizePolicy { num_digit_threshold: 5, collapse_orgs: true });
    let out = n.normalize("Общество с ограниченной ответственностью «Ромашка»");
    assert!(out.contains("ООО"));
    assert!(out.contains("ORG"));
    assert!(!out.contains("Ромашка"));
}

#[test]
fn specific_org_rules_win_over_the_general_one() {
    let n = Normalizer::new(NormalizePolicy { num_digit_threshold: 5, collapse_orgs: true });
    let out = n.normalize("иск закрытого акционерного общества к публичному акционерному обществу");
    assert!(out.contains("ЗАО"));
    assert!(out.contains("ПАО"));
    assert!(!out.contains("акционерно"));
}
