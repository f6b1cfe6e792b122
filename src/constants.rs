pub const SMALL_VALUE: f64 = 1e-6;
pub const BIG_VALUE: f64 = 1e8;
pub const TINY: f64 = 1e-6;
/// Lower bound on a link's head loss gradient (EPANET RQtol)
pub const RQ_TOL: f64 = 1e-7;

/// Kinematic viscosity of water at 20 C (ft2/s)
pub const VISCOSITY: f64 = 1.1e-5;
pub const PI: f64 = std::f64::consts::PI;

// length conversions
pub const M_PER_FT: f64 = 0.3048;

// flow conversions, units per cfs (source: EPANET 2.3 enumstxt.h / types.h)
pub const GPM_PER_CFS: f64 = 448.831;
pub const MGD_PER_CFS: f64 = 0.64632;
pub const IMGD_PER_CFS: f64 = 0.5382;
pub const AFD_PER_CFS: f64 = 1.9837;
pub const LPS_PER_CFS: f64 = 28.317;
pub const LPM_PER_CFS: f64 = 1699.0;
pub const MLD_PER_CFS: f64 = 2.4466;
pub const CMS_PER_CFS: f64 = 0.028317;
pub const CMH_PER_CFS: f64 = 101.94;
pub const CMD_PER_CFS: f64 = 2446.6;

// pressure conversions, units per ft of water head
pub const PSI_PER_FT: f64 = 0.4333;
pub const KPA_PER_PSI: f64 = 6.894757;
pub const BAR_PER_PSI: f64 = 0.0689476;

/// Minor loss conversion, K to head loss coefficient for q in cfs and d in ft
pub const MINOR_LOSS_FACTOR: f64 = 0.02517;
