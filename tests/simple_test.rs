//! Simple test to verify compilation and basic functionality

use grant_elections::{
    Config, ElectionConfiguration, Result,
    election::{
        AllocationTree, VaultShare, memory::InMemoryEnvironment, quadratic_weight,
    },
    types::{Address, ElectionState, ElectionTerm, Region, ShareType, tokens},
};

#[tokio::test]
async fn test_basic_compilation() -> Result<()> {
    println!("🔧 Testing basic compilation and functionality...");

    // Test configuration
    let config = Config::for_testing();
    assert!(config.engine.vault_allocation > 0);
    assert_eq!(config.engine.randomness_secret_bytes()?.len(), 32);
    println!("✅ Configuration works");

    // Test term defaults
    let yearly = ElectionConfiguration::default_for(ElectionTerm::Yearly);
    assert_eq!(yearly.registration_bond, tokens(1000));
    assert_eq!((yearly.ranking, yearly.awardees), (7, 3));
    assert_eq!(yearly.share_type, ShareType::EqualWeight);
    println!("✅ Term defaults work");

    // Test quadratic weights
    assert_eq!(quadratic_weight(5), 2);
    assert_eq!(quadratic_weight(100), 10);
    println!("✅ Quadratic weights work");

    // Test engine
    let env = InMemoryEnvironment::new(1_000);
    let engine = env.engine_with(config.engine);
    let election_id = engine.initialize(ElectionTerm::Monthly, Region::named("World"))?;
    assert_eq!(engine.election(election_id)?.state, ElectionState::Registration);
    println!("✅ Engine works");

    // Test merkle commitments
    let shares = vec![
        VaultShare {
            beneficiary: Address::from_label("a"),
            amount: 50,
        },
        VaultShare {
            beneficiary: Address::from_label("b"),
            amount: 50,
        },
    ];
    let tree = AllocationTree::new(&shares);
    let proof = tree.proof(1).expect("proof for second leaf");
    assert!(AllocationTree::verify(&tree.root(), &shares[1], &proof));
    println!("✅ Merkle commitments work");

    // Test journal
    let report = engine.verify_journal()?;
    assert!(report.is_intact());
    assert_eq!(report.records_checked, engine.events()?.len());
    println!("✅ Event journal works");

    println!("🎉 All basic functionality tests passed!");
    Ok(())
}
