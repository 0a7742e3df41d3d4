use rand::thread_rng;
use title_mill::{Generator, Pattern, Slot, Store, Word};

fn main() -> title_mill::Result<()> {
    let mut store = Store::open_in_memory()?;

    store.insert_words(&[
        Word::new("太陽", "名詞", "一般"),
        Word::new("月", "名詞", "一般"),
        Word::new("が", "助詞", "格助詞"),
        Word::new("昇る", "動詞", "自立"),
        Word::new("沈む", "動詞", "自立"),
    ])?;

    store.insert_patterns(&[Pattern::new(vec![
        Slot::new("名詞", "一般"),
        Slot::new("助詞", "格助詞"),
        Slot::new("動詞", "自立"),
    ])])?;

    let generator = Generator::new(&store);
    let mut rng = thread_rng();
    for _ in 0..5 {
        println!("{}", generator.generate(&mut rng)?);
    }
    Ok(())
}
